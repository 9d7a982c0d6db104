// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

//! Resize the default framebuffer along with the window
//!
//! Each resize is performed with client objects bound, which have to come
//! back untouched.

use gl::types::{GLint, GLuint};
use gl_canvas::{
	driver::TextureTarget,
	framebuffer::BufferMask,
	ContextAttributes,
	RenderingContext,
};

fn binding(pname: gl::types::GLenum) -> GLuint {
	let mut value: GLint = 0;
	unsafe { gl::GetIntegerv(pname, &mut value) };
	value as GLuint
}

fn main() {
	gl_canvas_tests::view_window(true, |driver, size| {
		let mut context = RenderingContext::new(driver, ContextAttributes::default(), size).unwrap();
		log::info!(
			"default framebuffer {:?} with {} samples",
			context.default_framebuffer().color_storage(),
			context.default_framebuffer().sample_count(),
		);

		let framebuffer = context.create_framebuffer().unwrap();
		let renderbuffer = context.create_renderbuffer().unwrap();
		let texture = context.create_texture().unwrap();

		let mut anim_t = 0.0f32;

		// loop
		move |resized| {
			if let Some(size) = resized {
				context.bind_framebuffer(Some(&framebuffer)).unwrap();
				context.bind_renderbuffer(Some(&renderbuffer)).unwrap();
				context.bind_texture(TextureTarget::Texture2D, Some(&texture)).unwrap();

				context.reshape(size).unwrap();
				log::info!("reshaped to {}x{}", size.width, size.height);

				assert_eq!(binding(gl::FRAMEBUFFER_BINDING), framebuffer.object());
				assert_eq!(binding(gl::RENDERBUFFER_BINDING), renderbuffer.object());
				assert_eq!(binding(gl::TEXTURE_BINDING_2D), texture.object());

				context.bind_framebuffer(None).unwrap();
				context.bind_renderbuffer(None).unwrap();
				context.bind_texture(TextureTarget::Texture2D, None).unwrap();
			}

			context.prepare_for_display().unwrap();
			assert_eq!(
				context.default_framebuffer().dirty_buffers(),
				context.default_framebuffer().unpreserved_buffers(),
			);

			anim_t = (anim_t + 0.005) % 1.0;
			unsafe { gl::ClearColor(anim_t, 0.2, 1.0 - anim_t, 1.0) };
			context.clear(BufferMask::COLOR | BufferMask::DEPTH).unwrap();
			assert!(context.default_framebuffer().dirty_buffers().is_empty());

			gl_canvas_tests::present(&context);
		}
	});
}
