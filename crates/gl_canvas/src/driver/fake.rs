// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

//! In-memory driver used by unit tests.

use std::{collections::HashMap, sync::Arc};

use gl::types::{GLint, GLintptr, GLsizei, GLuint};
use parking_lot::{Mutex, MutexGuard};

use super::{
	Attachment, AttributeType, BufferTarget, DrawMode, Driver, FramebufferStatus, InternalFormat,
	PixelFormat, TextureParameter, TextureTarget,
};
use crate::{framebuffer::BufferMask, object::ObjectKind, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage {
	pub format: InternalFormat,
	pub size: Size,
	pub samples: GLsizei,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attached {
	Renderbuffer(GLuint),
	Texture(GLuint),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
	BindFramebuffer(GLuint),
	BindRenderbuffer(GLuint),
	BindTexture(GLuint),
	RenderbufferStorage(Storage),
	ReshapeDrawingBuffer(InternalFormat, PixelFormat, Size),
	Clear(BufferMask),
	DrawArrays(DrawMode, GLint, GLsizei),
	VertexAttribPointer {
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		integer: bool,
		stride: GLsizei,
		offset: GLintptr,
	},
}

pub struct FakeState {
	pub current: bool,
	pub fail_allocations: bool,
	pub max_samples: GLint,
	pub max_vertex_attribs: GLuint,
	pub max_texture_units: GLuint,
	pub extensions: Vec<&'static str>,

	next_object: GLuint,
	pub live: HashMap<GLuint, ObjectKind>,
	pub released: Vec<(ObjectKind, GLuint)>,
	pub calls: Vec<Call>,

	pub framebuffer: GLuint,
	pub renderbuffer: GLuint,
	pub active_unit: GLuint,
	pub textures: HashMap<GLuint, GLuint>,
	pub array_buffer: GLuint,
	pub element_array_buffer: GLuint,
	pub vertex_array: GLuint,

	pub renderbuffer_storage: HashMap<GLuint, Storage>,
	pub texture_storage: HashMap<GLuint, Storage>,
	pub texture_parameters: HashMap<GLuint, Vec<TextureParameter>>,
	pub attachments: HashMap<GLuint, HashMap<Attachment, Attached>>,
	pub enabled_attribs: HashMap<GLuint, bool>,
}

pub struct FakeDriver {
	state: Mutex<FakeState>,
}

impl FakeDriver {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(FakeState {
				current: true,
				fail_allocations: false,
				max_samples: 8,
				max_vertex_attribs: 16,
				max_texture_units: 16,
				extensions: vec![super::OES_DEPTH24],
				next_object: 1,
				live: HashMap::new(),
				released: Vec::new(),
				calls: Vec::new(),
				framebuffer: 0,
				renderbuffer: 0,
				active_unit: 0,
				textures: HashMap::new(),
				array_buffer: 0,
				element_array_buffer: 0,
				vertex_array: 0,
				renderbuffer_storage: HashMap::new(),
				texture_storage: HashMap::new(),
				texture_parameters: HashMap::new(),
				attachments: HashMap::new(),
				enabled_attribs: HashMap::new(),
			}),
		}
	}

	pub fn shared() -> (Arc<FakeDriver>, Arc<dyn Driver>) {
		let fake = Arc::new(Self::new());
		let driver: Arc<dyn Driver> = fake.clone();
		(fake, driver)
	}

	pub fn state(&self) -> MutexGuard<'_, FakeState> {
		self.state.lock()
	}

	pub fn bound_texture(&self) -> GLuint {
		let state = self.state();
		state.textures.get(&state.active_unit).copied().unwrap_or(0)
	}

	pub fn release_count(&self, kind: ObjectKind, object: GLuint) -> usize {
		self.state().released.iter().filter(|released| **released == (kind, object)).count()
	}

	fn create(&self, kind: ObjectKind) -> GLuint {
		let mut state = self.state();
		if state.fail_allocations {
			return 0
		}

		let object = state.next_object;
		state.next_object += 1;
		state.live.insert(object, kind);
		object
	}

	fn delete(&self, kind: ObjectKind, object: GLuint) {
		let mut state = self.state();
		assert_eq!(state.live.remove(&object), Some(kind), "deleting unknown {kind:?} {object}");
		state.released.push((kind, object));
	}
}

fn attachment_storage(state: &FakeState, attached: &Attached) -> Option<Storage> {
	match attached {
		Attached::Renderbuffer(object) => state.renderbuffer_storage.get(object).copied(),
		Attached::Texture(object) => state.texture_storage.get(object).copied(),
	}
}

fn attachment_accepts(attachment: Attachment, format: InternalFormat) -> bool {
	use InternalFormat::*;

	match attachment {
		Attachment::Color0 => matches!(format, Rgba8 | Rgb8),
		Attachment::Depth => matches!(format, DepthComponent16 | DepthComponent24),
		Attachment::Stencil => matches!(format, StencilIndex8),
		Attachment::DepthStencil => matches!(format, Depth24Stencil8),
	}
}

impl Driver for FakeDriver {
	fn make_current(&self) -> bool {
		self.state().current
	}

	fn create_buffer(&self) -> GLuint {
		self.create(ObjectKind::Buffer)
	}

	fn create_framebuffer(&self) -> GLuint {
		self.create(ObjectKind::Framebuffer)
	}

	fn create_renderbuffer(&self) -> GLuint {
		self.create(ObjectKind::Renderbuffer)
	}

	fn create_texture(&self) -> GLuint {
		self.create(ObjectKind::Texture)
	}

	fn create_vertex_array(&self) -> GLuint {
		self.create(ObjectKind::VertexArray)
	}

	fn delete_buffer(&self, buffer: GLuint) {
		self.delete(ObjectKind::Buffer, buffer)
	}

	fn delete_framebuffer(&self, framebuffer: GLuint) {
		self.delete(ObjectKind::Framebuffer, framebuffer)
	}

	fn delete_renderbuffer(&self, renderbuffer: GLuint) {
		self.delete(ObjectKind::Renderbuffer, renderbuffer)
	}

	fn delete_texture(&self, texture: GLuint) {
		self.delete(ObjectKind::Texture, texture)
	}

	fn delete_vertex_array(&self, vertex_array: GLuint) {
		self.delete(ObjectKind::VertexArray, vertex_array)
	}

	fn bind_buffer(&self, target: BufferTarget, buffer: GLuint) {
		let mut state = self.state();
		match target {
			BufferTarget::Array => state.array_buffer = buffer,
			BufferTarget::ElementArray => state.element_array_buffer = buffer,
		}
	}

	fn bind_framebuffer(&self, framebuffer: GLuint) {
		let mut state = self.state();
		state.framebuffer = framebuffer;
		state.calls.push(Call::BindFramebuffer(framebuffer));
	}

	fn bind_renderbuffer(&self, renderbuffer: GLuint) {
		let mut state = self.state();
		state.renderbuffer = renderbuffer;
		state.calls.push(Call::BindRenderbuffer(renderbuffer));
	}

	fn bind_texture(&self, _target: TextureTarget, texture: GLuint) {
		let mut state = self.state();
		let unit = state.active_unit;
		state.textures.insert(unit, texture);
		state.calls.push(Call::BindTexture(texture));
	}

	fn bind_vertex_array(&self, vertex_array: GLuint) {
		self.state().vertex_array = vertex_array;
	}

	fn active_texture(&self, unit: GLuint) {
		self.state().active_unit = unit;
	}

	fn tex_parameter(&self, _target: TextureTarget, parameter: TextureParameter) {
		let texture = self.bound_texture();
		assert_ne!(texture, 0, "texture parameter set without a bound texture");
		self.state().texture_parameters.entry(texture).or_default().push(parameter);
	}

	fn renderbuffer_storage(&self, format: InternalFormat, size: Size) {
		self.renderbuffer_storage_multisample(0, format, size);
	}

	fn renderbuffer_storage_multisample(&self, samples: GLsizei, format: InternalFormat, size: Size) {
		let mut state = self.state();
		let renderbuffer = state.renderbuffer;
		assert_ne!(renderbuffer, 0, "renderbuffer storage without a bound renderbuffer");

		let storage = Storage { format, size, samples };
		state.renderbuffer_storage.insert(renderbuffer, storage);
		state.calls.push(Call::RenderbufferStorage(storage));
	}

	fn reshape_drawing_buffer(
		&self,
		_target: TextureTarget,
		internal_format: InternalFormat,
		format: PixelFormat,
		size: Size,
	) {
		let texture = self.bound_texture();
		assert_ne!(texture, 0, "drawing buffer reshaped without a bound texture");

		let mut state = self.state();
		state.texture_storage.insert(texture, Storage {
			format: internal_format,
			size,
			samples: 0,
		});
		state.calls.push(Call::ReshapeDrawingBuffer(internal_format, format, size));
	}

	fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: GLuint) {
		let mut state = self.state();
		let framebuffer = state.framebuffer;
		assert_ne!(framebuffer, 0, "attaching to the window framebuffer");

		state
			.attachments
			.entry(framebuffer)
			.or_default()
			.insert(attachment, Attached::Renderbuffer(renderbuffer));
	}

	fn framebuffer_texture_2d(
		&self,
		attachment: Attachment,
		_target: TextureTarget,
		texture: GLuint,
		level: GLint,
	) {
		assert_eq!(level, 0);

		let mut state = self.state();
		let framebuffer = state.framebuffer;
		assert_ne!(framebuffer, 0, "attaching to the window framebuffer");

		state
			.attachments
			.entry(framebuffer)
			.or_default()
			.insert(attachment, Attached::Texture(texture));
	}

	fn check_framebuffer_status(&self) -> FramebufferStatus {
		let state = self.state();
		if state.framebuffer == 0 {
			return FramebufferStatus::Complete
		}

		let Some(attachments) = state.attachments.get(&state.framebuffer) else {
			return FramebufferStatus::MissingAttachment
		};
		if !attachments.contains_key(&Attachment::Color0) {
			return FramebufferStatus::MissingAttachment
		}

		let mut shape = None;
		for (attachment, attached) in attachments {
			let Some(storage) = attachment_storage(&state, attached) else {
				return FramebufferStatus::IncompleteAttachment
			};
			if storage.size.is_empty() || !attachment_accepts(*attachment, storage.format) {
				return FramebufferStatus::IncompleteAttachment
			}

			match shape {
				None => shape = Some((storage.size, storage.samples)),
				Some((size, _)) if size != storage.size => return FramebufferStatus::Unsupported,
				Some((_, samples)) if samples != storage.samples =>
					return FramebufferStatus::IncompleteMultisample,
				_ => {},
			}
		}

		FramebufferStatus::Complete
	}

	fn enable_vertex_attrib_array(&self, index: GLuint) {
		self.state().enabled_attribs.insert(index, true);
	}

	fn disable_vertex_attrib_array(&self, index: GLuint) {
		self.state().enabled_attribs.insert(index, false);
	}

	fn vertex_attrib_pointer(
		&self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		_normalized: bool,
		stride: GLsizei,
		offset: GLintptr,
	) {
		self.state().calls.push(Call::VertexAttribPointer {
			index,
			size,
			ty,
			integer: false,
			stride,
			offset,
		});
	}

	fn vertex_attrib_i_pointer(
		&self,
		index: GLuint,
		size: GLint,
		ty: AttributeType,
		stride: GLsizei,
		offset: GLintptr,
	) {
		self.state().calls.push(Call::VertexAttribPointer {
			index,
			size,
			ty,
			integer: true,
			stride,
			offset,
		});
	}

	fn vertex_attrib_divisor(&self, _index: GLuint, _divisor: GLuint) {}

	fn clear(&self, mask: BufferMask) {
		self.state().calls.push(Call::Clear(mask));
	}

	fn draw_arrays(&self, mode: DrawMode, first: GLint, count: GLsizei) {
		self.state().calls.push(Call::DrawArrays(mode, first, count));
	}

	fn max_samples(&self) -> GLint {
		self.state().max_samples
	}

	fn max_vertex_attribs(&self) -> GLuint {
		self.state().max_vertex_attribs
	}

	fn max_texture_units(&self) -> GLuint {
		self.state().max_texture_units
	}

	fn supports_extension(&self, name: &str) -> bool {
		self.state().extensions.iter().any(|extension| *extension == name)
	}
}
