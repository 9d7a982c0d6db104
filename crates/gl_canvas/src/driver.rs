// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use gl::types::{GLenum, GLint, GLintptr, GLsizei, GLuint};

use crate::{framebuffer::BufferMask, Size};

#[cfg(test)]
pub(crate) mod fake;
pub mod native;

pub use native::NativeDriver;
pub use crate::vertex_array::AttributeType;

/// Extension advertising 24 bit depth renderbuffers.
pub const OES_DEPTH24: &str = "GL_OES_depth24";

/// Synchronous call surface of the underlying GL driver.
///
/// Every call assumes the driver context was made current on the calling
/// thread with [`Driver::make_current`]. Object creation returns 0 when
/// the driver could not allocate an object.
pub trait Driver: Send + Sync {
	/// Make the driver context current on the calling thread.
	fn make_current(&self) -> bool;

	fn create_buffer(&self) -> GLuint;
	fn create_framebuffer(&self) -> GLuint;
	fn create_renderbuffer(&self) -> GLuint;
	fn create_texture(&self) -> GLuint;
	fn create_vertex_array(&self) -> GLuint;

	fn delete_buffer(&self, buffer: GLuint);
	fn delete_framebuffer(&self, framebuffer: GLuint);
	fn delete_renderbuffer(&self, renderbuffer: GLuint);
	fn delete_texture(&self, texture: GLuint);
	fn delete_vertex_array(&self, vertex_array: GLuint);

	fn bind_buffer(&self, target: BufferTarget, buffer: GLuint);
	fn bind_framebuffer(&self, framebuffer: GLuint);
	fn bind_renderbuffer(&self, renderbuffer: GLuint);
	fn bind_texture(&self, target: TextureTarget, texture: GLuint);
	fn bind_vertex_array(&self, vertex_array: GLuint);
	/// Select the texture unit `unit` (zero based).
	fn active_texture(&self, unit: GLuint);

	fn tex_parameter(&self, target: TextureTarget, parameter: TextureParameter);

	/// Allocate storage for the bound renderbuffer.
	fn renderbuffer_storage(&self, format: InternalFormat, size: Size);
	/// Allocate multisampled storage for the bound renderbuffer.
	fn renderbuffer_storage_multisample(&self, samples: GLsizei, format: InternalFormat, size: Size);
	/// Reallocate the texture bound to `target` as a drawing buffer of `size`.
	/// Contents are undefined afterwards.
	fn reshape_drawing_buffer(
		&self,
		target: TextureTarget,
		internal_format: InternalFormat,
		format: PixelFormat,
		size: Size,
	);

	/// Attach `renderbuffer` to the bound framebuffer.
	fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: GLuint);
	/// Attach mip `level` of `texture` to the bound framebuffer.
	fn framebuffer_texture_2d(
		&self,
		attachment: Attachment,
		target: TextureTarget,
		texture: GLuint,
		level: GLint,
	);
	fn check_framebuffer_status(&self) -> FramebufferStatus;

	fn enable_vertex_attrib_array(&self, index: GLuint);
	fn disable_vertex_attrib_array(&self, index: GLuint);
	fn vertex_attrib_pointer(
		&self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		normalized: bool,
		stride: GLsizei,
		offset: GLintptr,
	);
	fn vertex_attrib_i_pointer(
		&self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		stride: GLsizei,
		offset: GLintptr,
	);
	fn vertex_attrib_divisor(&self, index: GLuint, divisor: GLuint);

	fn clear(&self, mask: BufferMask);
	fn draw_arrays(&self, mode: DrawMode, first: GLint, count: GLsizei);

	fn max_samples(&self) -> GLint;
	fn max_vertex_attribs(&self) -> GLuint;
	/// Texture units usable across all shader stages.
	fn max_texture_units(&self) -> GLuint;
	fn supports_extension(&self, name: &str) -> bool;
}

/// Driver limits queried once per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	pub max_samples: GLint,
	pub max_vertex_attribs: GLuint,
	pub max_texture_units: GLuint,
	pub oes_depth24: bool,
}

impl Capabilities {
	pub fn query(driver: &dyn Driver) -> Self {
		Self {
			max_samples: driver.max_samples(),
			max_vertex_attribs: driver.max_vertex_attribs(),
			max_texture_units: driver.max_texture_units(),
			oes_depth24: driver.supports_extension(OES_DEPTH24),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
	Array,
	ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
	Texture2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
	Color0,
	Depth,
	Stencil,
	DepthStencil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalFormat {
	Rgba8,
	Rgb8,
	DepthComponent16,
	DepthComponent24,
	Depth24Stencil8,
	StencilIndex8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
	Rgba,
	Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
	Nearest,
	Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
	ClampToEdge,
	Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureParameter {
	MinFilter(TextureFilter),
	MagFilter(TextureFilter),
	WrapS(TextureWrap),
	WrapT(TextureWrap),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
	Complete,
	IncompleteAttachment,
	MissingAttachment,
	IncompleteMultisample,
	Unsupported,
	Other(GLenum),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
	Points,
	Lines,
	LineStrip,
	Triangles,
	TriangleStrip,
	TriangleFan,
}

impl BufferTarget {
	#[inline]
	pub fn gl_enum(&self) -> GLenum {
		match self {
			Self::Array => gl::ARRAY_BUFFER,
			Self::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
		}
	}
}

impl TextureTarget {
	#[inline]
	pub fn gl_enum(&self) -> GLenum {
		match self {
			Self::Texture2D => gl::TEXTURE_2D,
		}
	}
}

impl Attachment {
	#[inline]
	pub fn gl_enum(&self) -> GLenum {
		match self {
			Self::Color0 => gl::COLOR_ATTACHMENT0,
			Self::Depth => gl::DEPTH_ATTACHMENT,
			Self::Stencil => gl::STENCIL_ATTACHMENT,
			Self::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
		}
	}
}

impl InternalFormat {
	#[inline]
	pub fn gl_enum(&self) -> GLenum {
		match self {
			Self::Rgba8 => gl::RGBA8,
			Self::Rgb8 => gl::RGB8,
			Self::DepthComponent16 => gl::DEPTH_COMPONENT16,
			Self::DepthComponent24 => gl::DEPTH_COMPONENT24,
			Self::Depth24Stencil8 => gl::DEPTH24_STENCIL8,
			Self::StencilIndex8 => gl::STENCIL_INDEX8,
		}
	}

	/// Attachment point a depth/stencil renderbuffer of this format uses.
	///
	/// Combined depth+stencil storage goes to the synthetic
	/// `DEPTH_STENCIL_ATTACHMENT` point.
	pub fn depth_stencil_attachment(&self) -> Attachment {
		match self {
			Self::Depth24Stencil8 => Attachment::DepthStencil,
			Self::StencilIndex8 => Attachment::Stencil,
			Self::DepthComponent16 | Self::DepthComponent24 => Attachment::Depth,
			Self::Rgba8 | Self::Rgb8 => panic!("{self:?} is not a depth/stencil format"),
		}
	}

	/// External pixel format paired with a color format.
	pub fn pixel_format(&self) -> PixelFormat {
		match self {
			Self::Rgba8 => PixelFormat::Rgba,
			_ => PixelFormat::Rgb,
		}
	}
}

impl PixelFormat {
	#[inline]
	pub fn gl_enum(&self) -> GLenum {
		match self {
			Self::Rgba => gl::RGBA,
			Self::Rgb => gl::RGB,
		}
	}
}

impl TextureParameter {
	/// (pname, param) pair for `glTexParameteri`.
	pub fn gl_pair(&self) -> (GLenum, GLint) {
		let filter = |f: &TextureFilter| match f {
			TextureFilter::Nearest => gl::NEAREST as GLint,
			TextureFilter::Linear => gl::LINEAR as GLint,
		};
		let wrap = |w: &TextureWrap| match w {
			TextureWrap::ClampToEdge => gl::CLAMP_TO_EDGE as GLint,
			TextureWrap::Repeat => gl::REPEAT as GLint,
		};

		match self {
			Self::MinFilter(f) => (gl::TEXTURE_MIN_FILTER, filter(f)),
			Self::MagFilter(f) => (gl::TEXTURE_MAG_FILTER, filter(f)),
			Self::WrapS(w) => (gl::TEXTURE_WRAP_S, wrap(w)),
			Self::WrapT(w) => (gl::TEXTURE_WRAP_T, wrap(w)),
		}
	}
}

impl FramebufferStatus {
	pub fn from_gl(status: GLenum) -> Self {
		match status {
			gl::FRAMEBUFFER_COMPLETE => Self::Complete,
			gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => Self::IncompleteAttachment,
			gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => Self::MissingAttachment,
			gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => Self::IncompleteMultisample,
			gl::FRAMEBUFFER_UNSUPPORTED => Self::Unsupported,
			other => Self::Other(other),
		}
	}
}

impl DrawMode {
	#[inline]
	pub fn gl_enum(&self) -> GLenum {
		match self {
			Self::Points => gl::POINTS,
			Self::Lines => gl::LINES,
			Self::LineStrip => gl::LINE_STRIP,
			Self::Triangles => gl::TRIANGLES,
			Self::TriangleStrip => gl::TRIANGLE_STRIP,
			Self::TriangleFan => gl::TRIANGLE_FAN,
		}
	}
}
