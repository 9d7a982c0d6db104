// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use std::ffi::{c_char, c_void, CStr};

use gl::types::{GLenum, GLsizei, GLuint};

/// Forward driver debug output into `log` under the `OpenGL` target.
pub fn setup_gl_debug() {
	if !gl::DebugMessageCallback::is_loaded() {
		log::warn!("driver has no debug output, GL errors will go unreported");
		return
	}

	unsafe {
		gl::Enable(gl::DEBUG_OUTPUT);
		gl::Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS);
		gl::DebugMessageCallback(Some(forward_message), std::ptr::null());
		gl::DebugMessageControl(
			gl::DONT_CARE,
			gl::DONT_CARE,
			gl::DONT_CARE,
			0,
			std::ptr::null(),
			gl::TRUE,
		);
	}
}

fn source_name(source: GLenum) -> &'static str {
	match source {
		gl::DEBUG_SOURCE_API => "API",
		gl::DEBUG_SOURCE_WINDOW_SYSTEM => "Window System",
		gl::DEBUG_SOURCE_SHADER_COMPILER => "Shader Compiler",
		gl::DEBUG_SOURCE_THIRD_PARTY => "Third Party",
		gl::DEBUG_SOURCE_APPLICATION => "Application",
		_ => "Other",
	}
}

fn type_name(ty: GLenum) -> &'static str {
	match ty {
		gl::DEBUG_TYPE_ERROR => "Error",
		gl::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "Deprecated Behavior",
		gl::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "Undefined Behavior",
		gl::DEBUG_TYPE_PORTABILITY => "Portability",
		gl::DEBUG_TYPE_PERFORMANCE => "Performance",
		gl::DEBUG_TYPE_MARKER => "Marker",
		_ => "Other",
	}
}

extern "system" fn forward_message(
	source: GLenum,
	ty: GLenum,
	id: GLuint,
	severity: GLenum,
	_length: GLsizei,
	message: *const c_char,
	_user_param: *mut c_void,
) {
	let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
	let source = source_name(source);
	let ty = type_name(ty);

	let level = match severity {
		gl::DEBUG_SEVERITY_HIGH => log::Level::Error,
		gl::DEBUG_SEVERITY_MEDIUM => log::Level::Warn,
		gl::DEBUG_SEVERITY_LOW => log::Level::Debug,
		_ => log::Level::Trace,
	};

	log::log!(target: "OpenGL", level, "{ty} {id}: {source}: {message}");
}
