// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

//! State tracking for a canvas-style GL rendering context.
//!
//! Sits between a client-facing graphics API and a native driver. Tracks
//! the implicit default framebuffer of a context and the binding state of
//! vertex array objects, issuing all driver work through [`driver::Driver`].

use gl::types::GLsizei;

pub mod context;
pub mod driver;
pub mod framebuffer;
pub mod object;
pub mod vertex_array;

pub use context::{ContextAttributes, ContextError, RenderingContext};
pub use driver::Driver;

/// Size of a drawable surface in pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Size {
	pub width: GLsizei,
	pub height: GLsizei,
}

impl Size {
	pub const fn new(width: GLsizei, height: GLsizei) -> Self {
		Self { width, height }
	}

	pub fn is_empty(&self) -> bool {
		self.width <= 0 || self.height <= 0
	}
}

impl From<[GLsizei; 2]> for Size {
	fn from([width, height]: [GLsizei; 2]) -> Self {
		Self { width, height }
	}
}
