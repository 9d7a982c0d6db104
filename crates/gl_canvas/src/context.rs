// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use std::sync::Arc;

use gl::types::{GLint, GLintptr, GLsizei, GLuint};
use thiserror::Error;

use crate::{
	driver::{AttributeType, BufferTarget, Capabilities, DrawMode, Driver, TextureTarget},
	framebuffer::{BufferMask, ClientBindings, DefaultFramebuffer},
	object::{object_or_zero, Buffer, Framebuffer, Renderbuffer, Texture},
	vertex_array::{VertexArrayState, VertexAttribFormat},
	Size,
};


/// Largest stride accepted by `vertex_attrib_pointer`.
pub const MAX_VERTEX_ATTRIB_STRIDE: GLsizei = 255;

/// Creation time properties of the default framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAttributes {
	pub alpha: bool,
	pub depth: bool,
	pub stencil: bool,
	pub antialias: bool,
	/// Keep drawing buffer contents across presentation.
	pub preserve_drawing_buffer: bool,
}

impl Default for ContextAttributes {
	fn default() -> Self {
		Self {
			alpha: true,
			depth: true,
			stencil: false,
			antialias: true,
			preserve_drawing_buffer: false,
		}
	}
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
	#[error("could not make the driver context current")]
	NotCurrent,
	#[error("invalid value: {0}")]
	InvalidValue(&'static str),
	#[error("invalid operation: {0}")]
	InvalidOperation(&'static str),
}

/// Client side state of one rendering context.
///
/// Owns the default vertex array and the default framebuffer, and tracks
/// what the client has bound. Every operation makes the driver current
/// first.
pub struct RenderingContext {
	driver: Arc<dyn Driver>,
	capabilities: Capabilities,
	attributes: ContextAttributes,

	default_vertex_array: Arc<VertexArrayState>,
	default_framebuffer: DefaultFramebuffer,

	array_buffer: Option<Arc<Buffer>>,
	vertex_array: Arc<VertexArrayState>,
	framebuffer: Option<Arc<Framebuffer>>,
	renderbuffer: Option<Arc<Renderbuffer>>,
	active_texture_unit: GLuint,
	texture_units: Vec<Option<Arc<Texture>>>,
}

impl RenderingContext {
	pub fn new(
		driver: Arc<dyn Driver>,
		attributes: ContextAttributes,
		size: Size,
	) -> Result<Self, ContextError> {
		if !driver.make_current() {
			return Err(ContextError::NotCurrent)
		}

		let capabilities = Capabilities::query(&*driver);
		log::debug!("creating rendering context with {attributes:?}, {capabilities:?}");

		let size = clamp_drawing_buffer_size(size);
		let default_vertex_array = Arc::new(VertexArrayState::new_default(
			driver.clone(),
			capabilities.max_vertex_attribs,
		));
		let default_framebuffer =
			DefaultFramebuffer::new(driver.clone(), &capabilities, &attributes, size);

		Ok(Self {
			driver,
			capabilities,
			attributes,
			vertex_array: default_vertex_array.clone(),
			default_vertex_array,
			default_framebuffer,
			array_buffer: None,
			framebuffer: None,
			renderbuffer: None,
			active_texture_unit: 0,
			texture_units: vec![None; capabilities.max_texture_units.max(1) as usize],
		})
	}

	fn make_current(&self) -> Result<(), ContextError> {
		match self.driver.make_current() {
			true => Ok(()),
			false => Err(ContextError::NotCurrent),
		}
	}

	pub fn driver(&self) -> &Arc<dyn Driver> {
		&self.driver
	}

	pub fn attributes(&self) -> &ContextAttributes {
		&self.attributes
	}

	pub fn capabilities(&self) -> &Capabilities {
		&self.capabilities
	}

	pub fn default_framebuffer(&self) -> &DefaultFramebuffer {
		&self.default_framebuffer
	}

	pub fn bound_vertex_array(&self) -> &Arc<VertexArrayState> {
		&self.vertex_array
	}

	pub fn drawing_buffer_size(&self) -> Size {
		self.default_framebuffer.size()
	}

	/// Bindings a default framebuffer reshape has to restore.
	pub fn client_bindings(&self) -> ClientBindings {
		ClientBindings {
			framebuffer: self.framebuffer.as_ref().map(|framebuffer| framebuffer.object()),
			renderbuffer: object_or_zero(self.renderbuffer.as_ref()),
			texture_2d: object_or_zero(
				self.texture_units[self.active_texture_unit as usize].as_ref(),
			),
		}
	}

	pub fn create_buffer(&self) -> Result<Arc<Buffer>, ContextError> {
		self.make_current()?;
		Ok(Buffer::create(&self.driver))
	}

	pub fn create_framebuffer(&self) -> Result<Arc<Framebuffer>, ContextError> {
		self.make_current()?;
		Ok(Framebuffer::create(&self.driver))
	}

	pub fn create_renderbuffer(&self) -> Result<Arc<Renderbuffer>, ContextError> {
		self.make_current()?;
		Ok(Renderbuffer::create(&self.driver))
	}

	pub fn create_texture(&self) -> Result<Arc<Texture>, ContextError> {
		self.make_current()?;
		Ok(Texture::create(&self.driver))
	}

	pub fn create_vertex_array(&self) -> Result<Arc<VertexArrayState>, ContextError> {
		self.make_current()?;
		Ok(Arc::new(VertexArrayState::new_user(
			self.driver.clone(),
			self.capabilities.max_vertex_attribs,
		)))
	}

	/// Delete `buffer`, dropping it from the array buffer binding and the
	/// bound vertex array. Other vertex arrays keep it alive until they let
	/// go of it.
	pub fn delete_buffer(&mut self, buffer: &Arc<Buffer>) -> Result<(), ContextError> {
		self.make_current()?;
		if buffer.is_deleted() {
			return Ok(())
		}

		if is_bound(&self.array_buffer, buffer) {
			self.array_buffer = None;
		}
		self.vertex_array.unbind_buffer(buffer);

		buffer.delete_object();
		Ok(())
	}

	pub fn delete_vertex_array(
		&mut self,
		array: &Arc<VertexArrayState>,
	) -> Result<(), ContextError> {
		self.make_current()?;
		if array.is_default() || array.is_deleted() {
			return Ok(())
		}

		if Arc::ptr_eq(&self.vertex_array, array) {
			self.vertex_array = self.default_vertex_array.clone();
			self.driver.bind_vertex_array(self.vertex_array.object());
		}

		array.delete_object();
		Ok(())
	}

	pub fn delete_framebuffer(
		&mut self,
		framebuffer: &Arc<Framebuffer>,
	) -> Result<(), ContextError> {
		self.make_current()?;
		if framebuffer.is_deleted() {
			return Ok(())
		}

		if is_bound(&self.framebuffer, framebuffer) {
			self.framebuffer = None;
			self.driver.bind_framebuffer(self.default_framebuffer.object());
		}

		framebuffer.delete_object();
		Ok(())
	}

	pub fn delete_renderbuffer(
		&mut self,
		renderbuffer: &Arc<Renderbuffer>,
	) -> Result<(), ContextError> {
		self.make_current()?;
		if renderbuffer.is_deleted() {
			return Ok(())
		}

		if is_bound(&self.renderbuffer, renderbuffer) {
			self.renderbuffer = None;
		}

		renderbuffer.delete_object();
		Ok(())
	}

	pub fn delete_texture(&mut self, texture: &Arc<Texture>) -> Result<(), ContextError> {
		self.make_current()?;
		if texture.is_deleted() {
			return Ok(())
		}

		for unit in &mut self.texture_units {
			if is_bound(unit, texture) {
				*unit = None;
			}
		}

		texture.delete_object();
		Ok(())
	}

	/// Bind `buffer` to `target`. The element array binding belongs to the
	/// bound vertex array.
	pub fn bind_buffer(
		&mut self,
		target: BufferTarget,
		buffer: Option<&Arc<Buffer>>,
	) -> Result<(), ContextError> {
		self.make_current()?;
		check_not_deleted(buffer.map(|buffer| buffer.is_deleted()))?;

		match target {
			BufferTarget::Array => self.array_buffer = buffer.cloned(),
			BufferTarget::ElementArray => self.vertex_array.set_element_array_buffer(buffer.cloned()),
		}

		self.driver.bind_buffer(target, object_or_zero(buffer));
		Ok(())
	}

	/// Bind `array`, or the default vertex array for `None`.
	pub fn bind_vertex_array(
		&mut self,
		array: Option<&Arc<VertexArrayState>>,
	) -> Result<(), ContextError> {
		self.make_current()?;

		let array = array.unwrap_or(&self.default_vertex_array).clone();
		if !array.is_usable() {
			return Err(ContextError::InvalidOperation("vertex array was deleted"))
		}

		self.driver.bind_vertex_array(array.object());
		array.did_bind();
		self.vertex_array = array;
		Ok(())
	}

	/// Bind `framebuffer`, or the default framebuffer for `None`.
	pub fn bind_framebuffer(
		&mut self,
		framebuffer: Option<&Arc<Framebuffer>>,
	) -> Result<(), ContextError> {
		self.make_current()?;
		check_not_deleted(framebuffer.map(|framebuffer| framebuffer.is_deleted()))?;

		let object = match framebuffer {
			Some(framebuffer) => framebuffer.object(),
			None => self.default_framebuffer.object(),
		};
		self.driver.bind_framebuffer(object);
		self.framebuffer = framebuffer.cloned();
		Ok(())
	}

	pub fn bind_renderbuffer(
		&mut self,
		renderbuffer: Option<&Arc<Renderbuffer>>,
	) -> Result<(), ContextError> {
		self.make_current()?;
		check_not_deleted(renderbuffer.map(|renderbuffer| renderbuffer.is_deleted()))?;

		self.driver.bind_renderbuffer(object_or_zero(renderbuffer));
		self.renderbuffer = renderbuffer.cloned();
		Ok(())
	}

	/// Select texture unit `unit` (zero based) for [`RenderingContext::bind_texture`].
	pub fn active_texture(&mut self, unit: GLuint) -> Result<(), ContextError> {
		self.make_current()?;
		if unit >= self.capabilities.max_texture_units {
			return Err(ContextError::InvalidValue("texture unit out of range"))
		}

		self.driver.active_texture(unit);
		self.active_texture_unit = unit;
		Ok(())
	}

	pub fn bind_texture(
		&mut self,
		target: TextureTarget,
		texture: Option<&Arc<Texture>>,
	) -> Result<(), ContextError> {
		self.make_current()?;
		check_not_deleted(texture.map(|texture| texture.is_deleted()))?;

		self.driver.bind_texture(target, object_or_zero(texture));
		self.texture_units[self.active_texture_unit as usize] = texture.cloned();
		Ok(())
	}

	fn check_attrib_index(&self, index: GLuint) -> Result<(), ContextError> {
		match index < self.vertex_array.max_vertex_attribs() {
			true => Ok(()),
			false => Err(ContextError::InvalidValue("vertex attribute index out of range")),
		}
	}

	pub fn enable_vertex_attrib_array(&mut self, index: GLuint) -> Result<(), ContextError> {
		self.make_current()?;
		self.check_attrib_index(index)?;

		self.vertex_array.set_vertex_attrib_enabled(index, true);
		self.driver.enable_vertex_attrib_array(index);
		Ok(())
	}

	pub fn disable_vertex_attrib_array(&mut self, index: GLuint) -> Result<(), ContextError> {
		self.make_current()?;
		self.check_attrib_index(index)?;

		self.vertex_array.set_vertex_attrib_enabled(index, false);
		self.driver.disable_vertex_attrib_array(index);
		Ok(())
	}

	/// Source attribute `index` from the bound array buffer as floats.
	pub fn vertex_attrib_pointer(
		&mut self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		normalized: bool,
		stride: GLsizei,
		offset: GLintptr,
	) -> Result<(), ContextError> {
		self.make_current()?;
		let format =
			self.validate_attrib_pointer(index, size, ty, normalized, stride, offset, false)?;

		self.vertex_array.set_vertex_attrib_state(index, format, self.array_buffer.clone());
		self.driver.vertex_attrib_pointer(index, size, ty, normalized, stride, offset);
		Ok(())
	}

	/// Source attribute `index` from the bound array buffer as integers.
	pub fn vertex_attrib_i_pointer(
		&mut self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		stride: GLsizei,
		offset: GLintptr,
	) -> Result<(), ContextError> {
		self.make_current()?;
		if !ty.is_integer() {
			return Err(ContextError::InvalidValue("integer attribute with a non integer type"))
		}
		let format = self.validate_attrib_pointer(index, size, ty, false, stride, offset, true)?;

		self.vertex_array.set_vertex_attrib_state(index, format, self.array_buffer.clone());
		self.driver.vertex_attrib_i_pointer(index, size, ty, stride, offset);
		Ok(())
	}

	#[allow(clippy::too_many_arguments)]
	fn validate_attrib_pointer(
		&self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		normalized: bool,
		stride: GLsizei,
		offset: GLintptr,
		is_integer: bool,
	) -> Result<VertexAttribFormat, ContextError> {
		self.check_attrib_index(index)?;

		if !(1..=4).contains(&size) {
			return Err(ContextError::InvalidValue("attribute size must be between 1 and 4"))
		}
		if ty.is_packed() && size != 4 {
			return Err(ContextError::InvalidOperation("packed attribute types need 4 components"))
		}
		if !(0..=MAX_VERTEX_ATTRIB_STRIDE).contains(&stride) {
			return Err(ContextError::InvalidValue("attribute stride out of range"))
		}
		if offset < 0 {
			return Err(ContextError::InvalidValue("negative attribute offset"))
		}

		let type_size = ty.size();
		if stride % type_size != 0 || offset % type_size as GLintptr != 0 {
			return Err(ContextError::InvalidOperation(
				"attribute stride and offset must be multiples of the type size",
			))
		}
		if self.array_buffer.is_none() && offset != 0 {
			return Err(ContextError::InvalidOperation("attribute offset without an array buffer"))
		}

		Ok(VertexAttribFormat {
			bytes_per_element: ty.bytes_per_element(size),
			size,
			ty,
			normalized,
			stride,
			offset,
			is_integer,
		})
	}

	pub fn vertex_attrib_divisor(
		&mut self,
		index: GLuint,
		divisor: GLuint,
	) -> Result<(), ContextError> {
		self.make_current()?;
		self.check_attrib_index(index)?;

		self.vertex_array.set_vertex_attrib_divisor(index, divisor);
		self.driver.vertex_attrib_divisor(index, divisor);
		Ok(())
	}

	pub fn draw_arrays(
		&mut self,
		mode: DrawMode,
		first: GLint,
		count: GLsizei,
	) -> Result<(), ContextError> {
		self.make_current()?;
		if first < 0 || count < 0 {
			return Err(ContextError::InvalidValue("negative vertex range"))
		}
		if !self.vertex_array.are_all_enabled_attrib_buffers_bound() {
			return Err(ContextError::InvalidOperation("enabled attribute without a buffer"))
		}

		self.driver.draw_arrays(mode, first, count);
		Ok(())
	}

	pub fn clear(&mut self, mask: BufferMask) -> Result<(), ContextError> {
		self.make_current()?;

		self.driver.clear(mask);
		if self.framebuffer.is_none() {
			self.default_framebuffer.mark_buffers_clear(mask);
		}
		Ok(())
	}

	/// Resize the drawing buffer. Sizes are clamped to at least 1x1 and
	/// resizing to the current size does nothing.
	pub fn reshape(&mut self, size: Size) -> Result<(), ContextError> {
		self.make_current()?;

		let size = clamp_drawing_buffer_size(size);
		if size == self.default_framebuffer.size() {
			return Ok(())
		}

		let client = self.client_bindings();
		self.default_framebuffer.reshape(size, &client);
		Ok(())
	}

	/// Begin a presentation cycle. Unpreserved buffers become dirty.
	pub fn prepare_for_display(&mut self) -> Result<(), ContextError> {
		self.make_current()?;
		self.default_framebuffer.mark_all_unpreserved_buffers_dirty();
		Ok(())
	}
}

impl Drop for RenderingContext {
	fn drop(&mut self) {
		if !self.driver.make_current() {
			log::warn!("dropping rendering context without a current driver context");
		}
	}
}

fn clamp_drawing_buffer_size(size: Size) -> Size {
	Size::new(size.width.max(1), size.height.max(1))
}

fn is_bound<T>(binding: &Option<Arc<T>>, object: &Arc<T>) -> bool {
	binding.as_ref().map_or(false, |bound| Arc::ptr_eq(bound, object))
}

fn check_not_deleted(deleted: Option<bool>) -> Result<(), ContextError> {
	match deleted {
		Some(true) => Err(ContextError::InvalidOperation("object was deleted")),
		_ => Ok(()),
	}
}
