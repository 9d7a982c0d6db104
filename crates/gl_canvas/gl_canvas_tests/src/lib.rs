// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use std::sync::Arc;

use gl_canvas::{driver::NativeDriver, Driver, RenderingContext, Size};
use glfw::{Context, OpenGlProfileHint, WindowHint};

pub mod debug;

const WINDOW_SIZE: (u32, u32) = (800, 600);

/// Open a 3.3 core window and run `test` against a driver bound to it.
///
/// `test` receives the driver and the initial framebuffer size and returns
/// the per frame loop, which is handed the new framebuffer size after the
/// window was resized.
pub fn view_window<I, L>(vsync: bool, test: I)
where
	I: FnOnce(Arc<dyn Driver>, Size) -> L,
	L: FnMut(Option<Size>),
{
	let mut glfw = glfw::init(glfw::FAIL_ON_ERRORS).unwrap();
	glfw.window_hint(WindowHint::ContextVersion(3, 3));
	glfw.window_hint(WindowHint::OpenGlProfile(OpenGlProfileHint::Core));
	glfw.window_hint(WindowHint::OpenGlDebugContext(true));

	let (mut window, events) = glfw
		.create_window(WINDOW_SIZE.0, WINDOW_SIZE.1, "gl_canvas", glfw::WindowMode::Windowed)
		.unwrap();

	window.make_current();

	if !vsync {
		glfw.set_swap_interval(glfw::SwapInterval::None);
	}

	window.set_framebuffer_size_polling(true);

	gl::load_with(|p| window.get_proc_address(p));

	env_logger::init();
	debug::setup_gl_debug();

	// the window context stays current on this thread for the whole run
	let driver: Arc<dyn Driver> = Arc::new(unsafe {
		NativeDriver::new(|| !glfw::ffi::glfwGetCurrentContext().is_null())
	});

	let (width, height) = window.get_framebuffer_size();
	let mut test_loop = test(driver, Size::new(width, height));
	let mut resized = None;

	while !window.should_close() {
		test_loop(resized.take());

		window.swap_buffers();
		glfw.poll_events();
		for (_, event) in glfw::flush_messages(&events) {
			match event {
				glfw::WindowEvent::FramebufferSize(width, height) => {
					resized = Some(Size::new(width, height));
				},
				_ => {},
			}
		}
	}
}

/// Copy the default framebuffer of `context` to the window. Leaves the
/// default framebuffer bound.
pub fn present(context: &RenderingContext) {
	let framebuffer = context.default_framebuffer();
	let Size { width, height } = framebuffer.size();

	unsafe {
		gl::BindFramebuffer(gl::READ_FRAMEBUFFER, framebuffer.object());
		gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, 0);
		gl::BlitFramebuffer(
			0,
			0,
			width,
			height,
			0,
			0,
			width,
			height,
			gl::COLOR_BUFFER_BIT,
			gl::NEAREST,
		);
		gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.object());
	}
}
