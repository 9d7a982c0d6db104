// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use std::sync::Arc;

use bitflags::bitflags;
use gl::types::{GLbitfield, GLsizei, GLuint};

use crate::{
	context::ContextAttributes,
	driver::{
		Attachment, Capabilities, Driver, FramebufferStatus, InternalFormat, TextureFilter,
		TextureParameter, TextureTarget, TextureWrap,
	},
	object::{GpuObject, ObjectKind},
	Size,
};


/// Upper bound on the sample count of an antialiased default framebuffer.
pub const ANTIALIAS_MAX_SAMPLE_COUNT: GLsizei = 4;

const DRAWING_BUFFER_TARGET: TextureTarget = TextureTarget::Texture2D;

bitflags! {
	/// Logical buffers of a framebuffer, as passed to `glClear`.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct BufferMask: GLbitfield {
		const COLOR = gl::COLOR_BUFFER_BIT;
		const DEPTH = gl::DEPTH_BUFFER_BIT;
		const STENCIL = gl::STENCIL_BUFFER_BIT;
	}
}

/// Client visible bindings a reshape has to leave untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientBindings {
	/// Client framebuffer, `None` when the default framebuffer is bound. A
	/// bound framebuffer may still have handle 0 if its allocation failed.
	pub framebuffer: Option<GLuint>,
	pub renderbuffer: GLuint,
	/// 2D texture of the active texture unit.
	pub texture_2d: GLuint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorStorage {
	Renderbuffer,
	Texture,
}

/// Storage behind the implicit render target of a context.
///
/// Color goes to a renderbuffer when multisampling or preserving the drawing
/// buffer, and to a sampleable texture otherwise. Storage is reallocated on
/// every [`DefaultFramebuffer::reshape`], never resized in place.
///
/// Not meant for concurrent use. Every call, dropping included, assumes the
/// driver is current.
pub struct DefaultFramebuffer {
	driver: Arc<dyn Driver>,
	object: GpuObject,
	color_buffer: GpuObject,
	depth_stencil_buffer: Option<GpuObject>,
	internal_depth_stencil_format: Option<InternalFormat>,
	internal_color_format: InternalFormat,
	sample_count: GLsizei,
	unpreserved_buffers: BufferMask,
	dirty_buffers: BufferMask,
	size: Size,
}

impl DefaultFramebuffer {
	/// Allocate the framebuffer and its storage at `size`.
	///
	/// The managed framebuffer is left bound, as the draw target of a fresh
	/// context.
	pub fn new(
		driver: Arc<dyn Driver>,
		capabilities: &Capabilities,
		attributes: &ContextAttributes,
		size: Size,
	) -> Self {
		let mut unpreserved_buffers = BufferMask::empty();
		if !attributes.preserve_drawing_buffer {
			unpreserved_buffers |= BufferMask::COLOR;
			if attributes.stencil {
				unpreserved_buffers |= BufferMask::STENCIL;
			}
			if attributes.depth {
				unpreserved_buffers |= BufferMask::DEPTH;
			}
		}

		let sample_count = match attributes.antialias {
			true => ANTIALIAS_MAX_SAMPLE_COUNT.min(capabilities.max_samples).max(0),
			false => 0,
		};

		let object = GpuObject::create(ObjectKind::Framebuffer, driver.clone());
		driver.bind_framebuffer(object.object());

		let color_buffer = if sample_count > 0 || attributes.preserve_drawing_buffer {
			GpuObject::create(ObjectKind::Renderbuffer, driver.clone())
		} else {
			let texture = GpuObject::create(ObjectKind::Texture, driver.clone());
			driver.bind_texture(DRAWING_BUFFER_TARGET, texture.object());
			for parameter in [
				TextureParameter::MagFilter(TextureFilter::Linear),
				TextureParameter::MinFilter(TextureFilter::Linear),
				TextureParameter::WrapS(TextureWrap::ClampToEdge),
				TextureParameter::WrapT(TextureWrap::ClampToEdge),
			] {
				driver.tex_parameter(DRAWING_BUFFER_TARGET, parameter);
			}
			texture
		};

		let internal_depth_stencil_format = match (attributes.depth, attributes.stencil) {
			(true, true) => Some(InternalFormat::Depth24Stencil8),
			(true, false) if capabilities.oes_depth24 => Some(InternalFormat::DepthComponent24),
			(true, false) => Some(InternalFormat::DepthComponent16),
			(false, true) => Some(InternalFormat::StencilIndex8),
			(false, false) => None,
		};
		let depth_stencil_buffer = internal_depth_stencil_format
			.map(|_| GpuObject::create(ObjectKind::Renderbuffer, driver.clone()));

		let internal_color_format = match attributes.alpha {
			true => InternalFormat::Rgba8,
			false => InternalFormat::Rgb8,
		};

		let mut this = Self {
			driver,
			object,
			color_buffer,
			depth_stencil_buffer,
			internal_depth_stencil_format,
			internal_color_format,
			sample_count,
			unpreserved_buffers,
			dirty_buffers: BufferMask::empty(),
			size,
		};
		this.reshape(size, &ClientBindings::default());
		this
	}

	/// Reallocate all storage at `size`.
	///
	/// Bindings in `client` are restored before returning. Panics if the
	/// driver reports the result incomplete.
	pub fn reshape(&mut self, size: Size, client: &ClientBindings) {
		log::debug!("reshaping default framebuffer {} to {}x{}", self.object(), size.width, size.height);

		let driver = &*self.driver;
		if client.framebuffer.is_some() {
			driver.bind_framebuffer(self.object.object());
		}

		if let (Some(buffer), Some(format)) =
			(&self.depth_stencil_buffer, self.internal_depth_stencil_format)
		{
			driver.bind_renderbuffer(buffer.object());
			self.allocate_renderbuffer(format, size);
			driver.framebuffer_renderbuffer(format.depth_stencil_attachment(), buffer.object());
		}

		match self.color_storage() {
			ColorStorage::Renderbuffer => {
				driver.bind_renderbuffer(self.color_buffer.object());
				self.allocate_renderbuffer(self.internal_color_format, size);
				driver.framebuffer_renderbuffer(Attachment::Color0, self.color_buffer.object());
			},
			ColorStorage::Texture => {
				driver.bind_texture(DRAWING_BUFFER_TARGET, self.color_buffer.object());
				driver.reshape_drawing_buffer(
					DRAWING_BUFFER_TARGET,
					self.internal_color_format,
					self.internal_color_format.pixel_format(),
					size,
				);
				driver.framebuffer_texture_2d(
					Attachment::Color0,
					DRAWING_BUFFER_TARGET,
					self.color_buffer.object(),
					0,
				);
			},
		}

		assert_eq!(
			driver.check_framebuffer_status(),
			FramebufferStatus::Complete,
			"default framebuffer incomplete after reshape to {size:?}",
		);

		driver.bind_texture(TextureTarget::Texture2D, client.texture_2d);
		driver.bind_renderbuffer(client.renderbuffer);
		if let Some(framebuffer) = client.framebuffer {
			driver.bind_framebuffer(framebuffer);
		}

		self.size = size;
	}

	fn allocate_renderbuffer(&self, format: InternalFormat, size: Size) {
		match self.sample_count {
			0 => self.driver.renderbuffer_storage(format, size),
			samples => self.driver.renderbuffer_storage_multisample(samples, format, size),
		}
	}

	pub fn mark_buffers_clear(&mut self, buffers: BufferMask) {
		self.dirty_buffers.remove(buffers);
	}

	/// Start a new presentation cycle. Contents of unpreserved buffers are
	/// undefined until cleared.
	pub fn mark_all_unpreserved_buffers_dirty(&mut self) {
		self.dirty_buffers = self.unpreserved_buffers;
	}

	/// Driver handle of the managed framebuffer.
	pub fn object(&self) -> GLuint {
		self.object.object()
	}

	pub fn color_buffer(&self) -> GLuint {
		self.color_buffer.object()
	}

	/// 0 without depth and stencil.
	pub fn depth_stencil_buffer(&self) -> GLuint {
		self.depth_stencil_buffer.as_ref().map_or(0, GpuObject::object)
	}

	pub fn color_storage(&self) -> ColorStorage {
		match self.color_buffer.kind() {
			ObjectKind::Texture => ColorStorage::Texture,
			_ => ColorStorage::Renderbuffer,
		}
	}

	/// 0 when not multisampled.
	#[inline]
	pub fn sample_count(&self) -> GLsizei {
		self.sample_count
	}

	#[inline]
	pub fn internal_color_format(&self) -> InternalFormat {
		self.internal_color_format
	}

	#[inline]
	pub fn internal_depth_stencil_format(&self) -> Option<InternalFormat> {
		self.internal_depth_stencil_format
	}

	#[inline]
	pub fn unpreserved_buffers(&self) -> BufferMask {
		self.unpreserved_buffers
	}

	#[inline]
	pub fn dirty_buffers(&self) -> BufferMask {
		self.dirty_buffers
	}

	#[inline]
	pub fn size(&self) -> Size {
		self.size
	}
}
