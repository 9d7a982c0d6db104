// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use gl::types::{GLenum, GLint, GLintptr, GLsizei, GLuint};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::{
	driver::Driver,
	object::{Attached, AttachmentPoint, Buffer, GpuObject, ObjectKind},
};

#[cfg(test)]
mod test;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
	Byte,
	UnsignedByte,
	Short,
	UnsignedShort,
	Int,
	UnsignedInt,
	HalfFloat,
	Float,
	Int2101010Rev,
	UnsignedInt2101010Rev,
}

impl AttributeType {
	#[inline]
	pub fn gl_type(&self) -> GLenum {
		match self {
			Self::Byte => gl::BYTE,
			Self::UnsignedByte => gl::UNSIGNED_BYTE,
			Self::Short => gl::SHORT,
			Self::UnsignedShort => gl::UNSIGNED_SHORT,
			Self::Int => gl::INT,
			Self::UnsignedInt => gl::UNSIGNED_INT,
			Self::HalfFloat => gl::HALF_FLOAT,
			Self::Float => gl::FLOAT,
			Self::Int2101010Rev => gl::INT_2_10_10_10_REV,
			Self::UnsignedInt2101010Rev => gl::UNSIGNED_INT_2_10_10_10_REV,
		}
	}

	/// Size in bytes of one component. Packed types report the whole word.
	pub fn size(&self) -> GLsizei {
		match self {
			Self::Byte | Self::UnsignedByte => 1,
			Self::Short | Self::UnsignedShort | Self::HalfFloat => 2,
			Self::Int | Self::UnsignedInt | Self::Float => 4,
			Self::Int2101010Rev | Self::UnsignedInt2101010Rev => 4,
		}
	}

	/// Usable with `glVertexAttribIPointer`.
	pub fn is_integer(&self) -> bool {
		use AttributeType::*;

		matches!(self, Byte | UnsignedByte | Short | UnsignedShort | Int | UnsignedInt)
	}

	/// Four components packed into one 32 bit word.
	pub fn is_packed(&self) -> bool {
		matches!(self, Self::Int2101010Rev | Self::UnsignedInt2101010Rev)
	}

	/// Bytes one vertex of `components` components occupies.
	pub fn bytes_per_element(&self, components: GLint) -> GLsizei {
		match self.is_packed() {
			true => self.size(),
			false => self.size() * components,
		}
	}

	pub fn of<T: GlType>() -> Self {
		T::ATTRIBUTE_TYPE
	}
}

/// Rust scalars usable as vertex attribute components.
pub trait GlType: Sized {
	const ATTRIBUTE_TYPE: AttributeType;
}

macro_rules! gl_types {
	($($type:ident($attribute:ident);)*) => {
		$(
			impl GlType for $type {
				const ATTRIBUTE_TYPE: AttributeType = AttributeType::$attribute;
			}
		)*
	}
}

gl_types! {
	f32(Float);

	u32(UnsignedInt);
	u16(UnsignedShort);
	u8(UnsignedByte);

	i32(Int);
	i16(Short);
	i8(Byte);
}

/// Layout half of `glVertexAttrib[I]Pointer`, as captured by
/// [`VertexArrayState::set_vertex_attrib_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribFormat {
	pub bytes_per_element: GLsizei,
	pub size: GLint,
	pub ty: AttributeType,
	pub normalized: bool,
	/// 0 means tightly packed.
	pub stride: GLsizei,
	pub offset: GLintptr,
	pub is_integer: bool,
}

struct VertexAttribState {
	enabled: bool,
	buffer: AttachmentPoint<Buffer>,
	bytes_per_element: GLsizei,
	size: GLint,
	ty: AttributeType,
	normalized: bool,
	stride: GLsizei,
	original_stride: GLsizei,
	offset: GLintptr,
	divisor: GLuint,
	is_integer: bool,
}

impl Default for VertexAttribState {
	fn default() -> Self {
		Self {
			enabled: false,
			buffer: AttachmentPoint::default(),
			bytes_per_element: 0,
			size: 4,
			ty: AttributeType::Float,
			normalized: false,
			stride: 16,
			original_stride: 0,
			offset: 0,
			divisor: 0,
			is_integer: false,
		}
	}
}

impl VertexAttribState {
	fn validate_binding(&self) -> bool {
		!self.enabled || self.buffer.is_bound()
	}

	fn info(&self) -> VertexAttribInfo {
		VertexAttribInfo {
			enabled: self.enabled,
			buffer: self.buffer.get().cloned(),
			bytes_per_element: self.bytes_per_element,
			size: self.size,
			ty: self.ty,
			normalized: self.normalized,
			stride: self.stride,
			original_stride: self.original_stride,
			offset: self.offset,
			divisor: self.divisor,
			is_integer: self.is_integer,
		}
	}
}

/// Copy of one attribute slot. `buffer` is not counted as an attachment.
#[derive(Debug, Clone)]
pub struct VertexAttribInfo {
	pub enabled: bool,
	pub buffer: Option<Arc<Buffer>>,
	pub bytes_per_element: GLsizei,
	pub size: GLint,
	pub ty: AttributeType,
	pub normalized: bool,
	/// Effective stride, never 0.
	pub stride: GLsizei,
	/// Stride as the client passed it.
	pub original_stride: GLsizei,
	pub offset: GLintptr,
	pub divisor: GLuint,
	pub is_integer: bool,
}

impl VertexAttribInfo {
	pub fn is_bound(&self) -> bool {
		self.buffer.as_ref().map_or(false, |buffer| buffer.object() != 0)
	}

	pub fn validate_binding(&self) -> bool {
		!self.enabled || self.is_bound()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingCache {
	Unknown,
	AllBound,
	NotAllBound,
}

impl BindingCache {
	/// Account for one slot going from `was_valid` to `now_valid`.
	fn update(&mut self, was_valid: bool, now_valid: bool) {
		if !now_valid {
			*self = Self::NotAllBound;
		} else if !was_valid {
			*self = Self::Unknown;
		}
	}
}

struct Inner {
	element_array: AttachmentPoint<Buffer>,
	attribs: Vec<VertexAttribState>,
	cache: BindingCache,
}

impl Inner {
	fn attrib(&self, index: GLuint) -> &VertexAttribState {
		let count = self.attribs.len();
		self.attribs
			.get(index as usize)
			.unwrap_or_else(|| panic!("vertex attribute {index} out of range ({count} slots)"))
	}

	fn attrib_mut(&mut self, index: GLuint) -> &mut VertexAttribState {
		let count = self.attribs.len();
		self.attribs
			.get_mut(index as usize)
			.unwrap_or_else(|| panic!("vertex attribute {index} out of range ({count} slots)"))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexArrayType {
	/// The context's built-in array, driver handle 0.
	Default,
	User,
}

/// Buffer bindings of one vertex array object.
///
/// All slot state lives behind a single reader/writer lock. Buffers entering a
/// slot are attached before the lock is taken and buffers leaving a slot are
/// detached while it is held, so a buffer moving between slots is never
/// attached nowhere.
///
/// Detaching the last reference to a deleted buffer releases it through the
/// driver, so the driver must be current on the calling thread before any
/// mutating call.
pub struct VertexArrayState {
	ty: VertexArrayType,
	object: GpuObject,
	has_ever_been_bound: AtomicBool,
	inner: RwLock<Inner>,
}

impl VertexArrayState {
	fn new(ty: VertexArrayType, object: GpuObject, max_vertex_attribs: GLuint) -> Self {
		let attribs = (0..max_vertex_attribs).map(|_| VertexAttribState::default()).collect();

		Self {
			ty,
			object,
			has_ever_been_bound: AtomicBool::new(false),
			inner: RwLock::new(Inner {
				element_array: AttachmentPoint::default(),
				attribs,
				cache: BindingCache::Unknown,
			}),
		}
	}

	pub fn new_default(driver: Arc<dyn Driver>, max_vertex_attribs: GLuint) -> Self {
		let object = GpuObject::new(ObjectKind::VertexArray, driver);
		Self::new(VertexArrayType::Default, object, max_vertex_attribs)
	}

	pub fn new_user(driver: Arc<dyn Driver>, max_vertex_attribs: GLuint) -> Self {
		let object = GpuObject::create(ObjectKind::VertexArray, driver);
		Self::new(VertexArrayType::User, object, max_vertex_attribs)
	}

	#[inline]
	pub fn ty(&self) -> VertexArrayType {
		self.ty
	}

	#[inline]
	pub fn is_default(&self) -> bool {
		self.ty == VertexArrayType::Default
	}

	/// Driver handle. 0 for the default array.
	pub fn object(&self) -> GLuint {
		self.object.object()
	}

	pub fn is_deleted(&self) -> bool {
		self.object.is_deleted()
	}

	/// Live driver object that was not deleted. The default array is always
	/// usable.
	pub fn is_usable(&self) -> bool {
		if self.is_default() {
			return true
		}

		self.object.object() != 0 && !self.object.is_deleted()
	}

	pub fn did_bind(&self) {
		self.has_ever_been_bound.store(true, Ordering::Release);
	}

	/// Whether the array was bound at least once.
	pub fn is_initialized(&self) -> bool {
		self.has_ever_been_bound.load(Ordering::Acquire)
	}

	/// Delete the array object and drop every buffer binding it holds.
	pub fn delete_object(&self) {
		if self.is_default() {
			return
		}

		{
			let mut inner = self.inner.write();
			inner.element_array.take();
			for attrib in &mut inner.attribs {
				attrib.buffer.take();
			}
			inner.cache = BindingCache::Unknown;
		}

		self.object.delete_object();
	}

	pub fn max_vertex_attribs(&self) -> GLuint {
		self.inner.read().attribs.len() as GLuint
	}

	pub fn get_element_array_buffer(&self) -> Option<Arc<Buffer>> {
		self.inner.read().element_array.get().cloned()
	}

	pub fn set_element_array_buffer(&self, buffer: Option<Arc<Buffer>>) {
		let attached = buffer.map(Attached::new);
		self.inner.write().element_array.adopt(attached);
	}

	pub fn set_vertex_attrib_enabled(&self, index: GLuint, enabled: bool) {
		let mut inner = self.inner.write();
		let attrib = inner.attrib_mut(index);
		if attrib.enabled == enabled {
			return
		}

		let was_valid = attrib.validate_binding();
		attrib.enabled = enabled;
		let now_valid = attrib.validate_binding();

		inner.cache.update(was_valid, now_valid);
	}

	pub fn vertex_attrib_state(&self, index: GLuint) -> VertexAttribInfo {
		self.inner.read().attrib(index).info()
	}

	/// Point attribute `index` at `buffer` with the given layout.
	///
	/// A stride of 0 is stored as `bytes_per_element`, the stride as passed
	/// stays available as `original_stride`.
	pub fn set_vertex_attrib_state(
		&self,
		index: GLuint,
		format: VertexAttribFormat,
		buffer: Option<Arc<Buffer>>,
	) {
		let attached = buffer.map(Attached::new);

		let mut inner = self.inner.write();
		let attrib = inner.attrib_mut(index);

		let was_valid = attrib.validate_binding();
		attrib.buffer.adopt(attached);
		let now_valid = attrib.validate_binding();

		attrib.bytes_per_element = format.bytes_per_element;
		attrib.size = format.size;
		attrib.ty = format.ty;
		attrib.normalized = format.normalized;
		attrib.stride = match format.stride {
			0 => format.bytes_per_element,
			stride => stride,
		};
		attrib.original_stride = format.stride;
		attrib.offset = format.offset;
		attrib.is_integer = format.is_integer;

		inner.cache.update(was_valid, now_valid);
	}

	/// Whether any attribute slot references `buffer`.
	pub fn has_array_buffer(&self, buffer: &Arc<Buffer>) -> bool {
		self.inner.read().attribs.iter().any(|attrib| attrib.buffer.is(Some(buffer)))
	}

	/// Drop every reference to `buffer`. Called when the buffer is deleted.
	pub fn unbind_buffer(&self, buffer: &Arc<Buffer>) {
		let mut inner = self.inner.write();
		let inner = &mut *inner;

		if inner.element_array.is(Some(buffer)) {
			inner.element_array.take();
		}

		for attrib in &mut inner.attribs {
			if !attrib.buffer.is(Some(buffer)) {
				continue
			}

			let was_valid = attrib.validate_binding();
			attrib.buffer.take();
			inner.cache.update(was_valid, attrib.validate_binding());
		}
	}

	pub fn set_vertex_attrib_divisor(&self, index: GLuint, divisor: GLuint) {
		self.inner.write().attrib_mut(index).divisor = divisor;
	}

	/// Whether every enabled attribute is backed by a live buffer.
	///
	/// Answered from the cache when possible, otherwise computed once and
	/// cached until a slot's validity changes.
	pub fn are_all_enabled_attrib_buffers_bound(&self) -> bool {
		match self.inner.read().cache {
			BindingCache::AllBound => return true,
			BindingCache::NotAllBound => return false,
			BindingCache::Unknown => {},
		}

		let inner = self.inner.upgradable_read();
		let all_bound = match inner.cache {
			BindingCache::AllBound => return true,
			BindingCache::NotAllBound => return false,
			BindingCache::Unknown => inner.attribs.iter().all(VertexAttribState::validate_binding),
		};

		let mut inner = RwLockUpgradableReadGuard::upgrade(inner);
		inner.cache = match all_bound {
			true => BindingCache::AllBound,
			false => BindingCache::NotAllBound,
		};

		all_bound
	}
}

impl std::fmt::Debug for VertexArrayState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VertexArrayState")
			.field("ty", &self.ty)
			.field("object", &self.object)
			.field("initialized", &self.is_initialized())
			.finish_non_exhaustive()
	}
}
