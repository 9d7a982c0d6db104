// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use std::{
	ffi::{c_char, c_void, CStr},
	ptr,
};

use gl::types::{GLint, GLintptr, GLsizei, GLuint};

use super::{
	Attachment, AttributeType, BufferTarget, DrawMode, Driver, FramebufferStatus, InternalFormat,
	PixelFormat, TextureParameter, TextureTarget,
};
use crate::{framebuffer::BufferMask, Size};

type MakeCurrent = dyn Fn() -> bool + Send + Sync;

/// [`Driver`] backed by the global function pointers of the `gl` crate.
pub struct NativeDriver {
	make_current: Box<MakeCurrent>,
}

impl NativeDriver {
	/// # SAFETY
	/// * GL function pointers must be loaded with `gl::load_with`
	/// * driver calls must only be issued on a thread where `make_current`
	///   returned true
	pub unsafe fn new(make_current: impl Fn() -> bool + Send + Sync + 'static) -> Self {
		Self {
			make_current: Box::new(make_current),
		}
	}

	fn get_integer(&self, pname: gl::types::GLenum) -> GLint {
		let mut value = 0;
		unsafe { gl::GetIntegerv(pname, &mut value) };
		value
	}

	fn extensions(&self) -> Vec<String> {
		let extension_count = self.get_integer(gl::NUM_EXTENSIONS);

		(0..extension_count)
			.filter_map(|i| {
				let name = unsafe { gl::GetStringi(gl::EXTENSIONS, i as u32) };
				if name.is_null() {
					return None
				}

				unsafe { CStr::from_ptr(name as *const c_char) }.to_str().ok().map(str::to_owned)
			})
			.collect()
	}
}

macro_rules! gen_object {
	($gen:path) => {{
		let mut object = 0;
		unsafe { $gen(1, &mut object) };
		object
	}};
}

macro_rules! delete_object {
	($delete:path, $object:expr) => {{
		let object: GLuint = $object;
		unsafe { $delete(1, &object) };
	}};
}

impl Driver for NativeDriver {
	fn make_current(&self) -> bool {
		(self.make_current)()
	}

	fn create_buffer(&self) -> GLuint {
		gen_object!(gl::GenBuffers)
	}

	fn create_framebuffer(&self) -> GLuint {
		gen_object!(gl::GenFramebuffers)
	}

	fn create_renderbuffer(&self) -> GLuint {
		gen_object!(gl::GenRenderbuffers)
	}

	fn create_texture(&self) -> GLuint {
		gen_object!(gl::GenTextures)
	}

	fn create_vertex_array(&self) -> GLuint {
		gen_object!(gl::GenVertexArrays)
	}

	fn delete_buffer(&self, buffer: GLuint) {
		delete_object!(gl::DeleteBuffers, buffer)
	}

	fn delete_framebuffer(&self, framebuffer: GLuint) {
		delete_object!(gl::DeleteFramebuffers, framebuffer)
	}

	fn delete_renderbuffer(&self, renderbuffer: GLuint) {
		delete_object!(gl::DeleteRenderbuffers, renderbuffer)
	}

	fn delete_texture(&self, texture: GLuint) {
		delete_object!(gl::DeleteTextures, texture)
	}

	fn delete_vertex_array(&self, vertex_array: GLuint) {
		delete_object!(gl::DeleteVertexArrays, vertex_array)
	}

	fn bind_buffer(&self, target: BufferTarget, buffer: GLuint) {
		unsafe { gl::BindBuffer(target.gl_enum(), buffer) };
	}

	fn bind_framebuffer(&self, framebuffer: GLuint) {
		unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer) };
	}

	fn bind_renderbuffer(&self, renderbuffer: GLuint) {
		unsafe { gl::BindRenderbuffer(gl::RENDERBUFFER, renderbuffer) };
	}

	fn bind_texture(&self, target: TextureTarget, texture: GLuint) {
		unsafe { gl::BindTexture(target.gl_enum(), texture) };
	}

	fn bind_vertex_array(&self, vertex_array: GLuint) {
		unsafe { gl::BindVertexArray(vertex_array) };
	}

	fn active_texture(&self, unit: GLuint) {
		unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) };
	}

	fn tex_parameter(&self, target: TextureTarget, parameter: TextureParameter) {
		let (pname, param) = parameter.gl_pair();
		unsafe { gl::TexParameteri(target.gl_enum(), pname, param) };
	}

	fn renderbuffer_storage(&self, format: InternalFormat, size: Size) {
		unsafe {
			gl::RenderbufferStorage(gl::RENDERBUFFER, format.gl_enum(), size.width, size.height)
		};
	}

	fn renderbuffer_storage_multisample(&self, samples: GLsizei, format: InternalFormat, size: Size) {
		unsafe {
			gl::RenderbufferStorageMultisample(
				gl::RENDERBUFFER,
				samples,
				format.gl_enum(),
				size.width,
				size.height,
			)
		};
	}

	fn reshape_drawing_buffer(
		&self,
		target: TextureTarget,
		internal_format: InternalFormat,
		format: PixelFormat,
		size: Size,
	) {
		unsafe {
			gl::TexImage2D(
				target.gl_enum(),
				0,
				internal_format.gl_enum() as GLint,
				size.width,
				size.height,
				0,
				format.gl_enum(),
				gl::UNSIGNED_BYTE,
				ptr::null(),
			)
		};
	}

	fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: GLuint) {
		unsafe {
			gl::FramebufferRenderbuffer(
				gl::FRAMEBUFFER,
				attachment.gl_enum(),
				gl::RENDERBUFFER,
				renderbuffer,
			)
		};
	}

	fn framebuffer_texture_2d(
		&self,
		attachment: Attachment,
		target: TextureTarget,
		texture: GLuint,
		level: GLint,
	) {
		unsafe {
			gl::FramebufferTexture2D(
				gl::FRAMEBUFFER,
				attachment.gl_enum(),
				target.gl_enum(),
				texture,
				level,
			)
		};
	}

	fn check_framebuffer_status(&self) -> FramebufferStatus {
		FramebufferStatus::from_gl(unsafe { gl::CheckFramebufferStatus(gl::FRAMEBUFFER) })
	}

	fn enable_vertex_attrib_array(&self, index: GLuint) {
		unsafe { gl::EnableVertexAttribArray(index) };
	}

	fn disable_vertex_attrib_array(&self, index: GLuint) {
		unsafe { gl::DisableVertexAttribArray(index) };
	}

	fn vertex_attrib_pointer(
		&self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		normalized: bool,
		stride: GLsizei,
		offset: GLintptr,
	) {
		let normalized = match normalized {
			true => gl::TRUE,
			false => gl::FALSE,
		};

		unsafe {
			gl::VertexAttribPointer(
				index,
				size,
				ty.gl_type(),
				normalized,
				stride,
				offset as *const c_void,
			)
		};
	}

	fn vertex_attrib_i_pointer(
		&self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		stride: GLsizei,
		offset: GLintptr,
	) {
		unsafe {
			gl::VertexAttribIPointer(index, size, ty.gl_type(), stride, offset as *const c_void)
		};
	}

	fn vertex_attrib_divisor(&self, index: GLuint, divisor: GLuint) {
		unsafe { gl::VertexAttribDivisor(index, divisor) };
	}

	fn clear(&self, mask: BufferMask) {
		unsafe { gl::Clear(mask.bits()) };
	}

	fn draw_arrays(&self, mode: DrawMode, first: GLint, count: GLsizei) {
		unsafe { gl::DrawArrays(mode.gl_enum(), first, count) };
	}

	fn max_samples(&self) -> GLint {
		self.get_integer(gl::MAX_SAMPLES)
	}

	fn max_vertex_attribs(&self) -> GLuint {
		self.get_integer(gl::MAX_VERTEX_ATTRIBS).max(0) as GLuint
	}

	fn max_texture_units(&self) -> GLuint {
		self.get_integer(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS).max(0) as GLuint
	}

	fn supports_extension(&self, name: &str) -> bool {
		self.extensions().iter().any(|extension| extension == name)
	}
}
