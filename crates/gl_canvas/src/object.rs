// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

use std::{fmt, mem, ops::Deref, sync::Arc};

use gl::types::GLuint;
use parking_lot::Mutex;

use crate::driver::Driver;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
	Buffer,
	Framebuffer,
	Renderbuffer,
	Texture,
	VertexArray,
}

/// A driver backed resource shared between the client and the slots that
/// reference it.
///
/// Deleting an object that is still attached somewhere only marks it deleted.
/// The driver resource is released once the last attachment goes away.
pub struct GpuObject {
	kind: ObjectKind,
	driver: Arc<dyn Driver>,
	state: Mutex<ObjectState>,
}

struct ObjectState {
	object: GLuint,
	attachment_count: u32,
	deleted: bool,
}

impl GpuObject {
	/// Wrap an object without a driver resource yet. See [`GpuObject::set_object`].
	pub fn new(kind: ObjectKind, driver: Arc<dyn Driver>) -> Self {
		Self {
			kind,
			driver,
			state: Mutex::new(ObjectState {
				object: 0,
				attachment_count: 0,
				deleted: false,
			}),
		}
	}

	/// Allocate a driver resource of `kind`.
	///
	/// A driver out of objects yields an object with handle 0.
	pub fn create(kind: ObjectKind, driver: Arc<dyn Driver>) -> Self {
		let object = match kind {
			ObjectKind::Buffer => driver.create_buffer(),
			ObjectKind::Framebuffer => driver.create_framebuffer(),
			ObjectKind::Renderbuffer => driver.create_renderbuffer(),
			ObjectKind::Texture => driver.create_texture(),
			ObjectKind::VertexArray => driver.create_vertex_array(),
		};

		if object == 0 {
			log::warn!("driver returned no object when creating a {kind:?}");
		}

		let this = Self::new(kind, driver);
		this.set_object(object);
		this
	}

	/// Assign the driver handle. Only valid once, right after construction.
	pub fn set_object(&self, object: GLuint) {
		let mut state = self.state.lock();
		assert!(
			state.object == 0 && !state.deleted,
			"driver object of a {:?} assigned twice",
			self.kind
		);
		state.object = object;
	}

	#[inline]
	pub fn kind(&self) -> ObjectKind {
		self.kind
	}

	/// Driver handle, 0 once the resource was released.
	#[inline]
	pub fn object(&self) -> GLuint {
		self.state.lock().object
	}

	pub fn attachment_count(&self) -> u32 {
		self.state.lock().attachment_count
	}

	/// Whether the client asked for deletion. This says nothing about the
	/// driver resource, `object() == 0` does.
	pub fn is_deleted(&self) -> bool {
		self.state.lock().deleted
	}

	pub fn driver(&self) -> &Arc<dyn Driver> {
		&self.driver
	}

	/// Mark the object deleted, releasing the driver resource now if
	/// nothing is attached to it.
	pub fn delete_object(&self) {
		let mut state = self.state.lock();
		if state.deleted {
			return
		}

		state.deleted = true;
		if state.attachment_count == 0 {
			self.release(&mut state);
		}
	}

	pub fn on_attached(&self) {
		self.state.lock().attachment_count += 1;
	}

	pub fn on_detached(&self) {
		let mut state = self.state.lock();
		assert!(state.attachment_count > 0, "{:?} detached more often than attached", self.kind);

		state.attachment_count -= 1;
		if state.deleted && state.attachment_count == 0 {
			self.release(&mut state);
		}
	}

	fn release(&self, state: &mut ObjectState) {
		release_object(self.kind, &*self.driver, state);
	}
}

impl Drop for GpuObject {
	fn drop(&mut self) {
		release_object(self.kind, &*self.driver, self.state.get_mut());
	}
}

fn release_object(kind: ObjectKind, driver: &dyn Driver, state: &mut ObjectState) {
	let object = mem::replace(&mut state.object, 0);
	if object == 0 {
		return
	}

	log::trace!("releasing {kind:?} {object}");

	match kind {
		ObjectKind::Buffer => driver.delete_buffer(object),
		ObjectKind::Framebuffer => driver.delete_framebuffer(object),
		ObjectKind::Renderbuffer => driver.delete_renderbuffer(object),
		ObjectKind::Texture => driver.delete_texture(object),
		ObjectKind::VertexArray => driver.delete_vertex_array(object),
	}
}

impl fmt::Debug for GpuObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("GpuObject")
			.field("kind", &self.kind)
			.field("object", &state.object)
			.field("attachment_count", &state.attachment_count)
			.field("deleted", &state.deleted)
			.finish()
	}
}

/// Something a slot can reference and count itself against.
pub trait Attachable {
	fn on_attached(&self);
	fn on_detached(&self);
	fn object(&self) -> GLuint;
}

macro_rules! gpu_objects {
	($($(#[$meta:meta])* $name:ident($kind:ident);)*) => {
		$(
			$(#[$meta])*
			#[derive(Debug)]
			pub struct $name(GpuObject);

			impl $name {
				pub fn create(driver: &Arc<dyn Driver>) -> Arc<Self> {
					Arc::new(Self(GpuObject::create(ObjectKind::$kind, driver.clone())))
				}
			}

			impl Deref for $name {
				type Target = GpuObject;

				fn deref(&self) -> &GpuObject {
					&self.0
				}
			}

			impl Attachable for $name {
				fn on_attached(&self) {
					self.0.on_attached()
				}

				fn on_detached(&self) {
					self.0.on_detached()
				}

				fn object(&self) -> GLuint {
					self.0.object()
				}
			}
		)*
	}
}

gpu_objects! {
	/// Vertex or index data store.
	Buffer(Buffer);
	/// Client created framebuffer.
	Framebuffer(Framebuffer);
	Renderbuffer(Renderbuffer);
	Texture(Texture);
}

/// One counted attachment of `T`. Dropping it detaches.
pub struct Attached<T: Attachable>(Arc<T>);

impl<T: Attachable> Attached<T> {
	pub fn new(object: Arc<T>) -> Self {
		object.on_attached();
		Self(object)
	}

	#[inline]
	pub fn get(&self) -> &Arc<T> {
		&self.0
	}
}

impl<T: Attachable> Drop for Attached<T> {
	fn drop(&mut self) {
		self.0.on_detached();
	}
}

/// Slot holding zero or one attached `T`.
///
/// The slot never owns the pointee exclusively, it only takes part in the
/// attachment count.
pub struct AttachmentPoint<T: Attachable> {
	attached: Option<Attached<T>>,
}

impl<T: Attachable> AttachmentPoint<T> {
	pub fn new(object: Option<Arc<T>>) -> Self {
		Self {
			attached: object.map(Attached::new),
		}
	}

	/// Replace the referenced object, detaching the old one before
	/// attaching the new one.
	pub fn set(&mut self, object: Option<Arc<T>>) {
		if self.is(object.as_ref()) {
			return
		}

		self.attached = None;
		self.attached = object.map(Attached::new);
	}

	/// Store an attachment the caller already counted. The previous occupant
	/// is detached after the new one is in place.
	pub fn adopt(&mut self, attached: Option<Attached<T>>) {
		let previous = mem::replace(&mut self.attached, attached);
		drop(previous);
	}

	/// Clear the slot, returning the detached object.
	pub fn take(&mut self) -> Option<Arc<T>> {
		self.attached.take().map(|attached| attached.get().clone())
	}

	#[inline]
	pub fn get(&self) -> Option<&Arc<T>> {
		self.attached.as_ref().map(Attached::get)
	}

	/// Pointer identity with `object`, `None` matching an empty slot.
	pub fn is(&self, object: Option<&Arc<T>>) -> bool {
		match (self.get(), object) {
			(Some(current), Some(object)) => Arc::ptr_eq(current, object),
			(None, None) => true,
			_ => false,
		}
	}

	/// Occupied by an object that still has a driver resource.
	pub fn is_bound(&self) -> bool {
		self.object_or_zero() != 0
	}

	pub fn object_or_zero(&self) -> GLuint {
		self.get().map_or(0, |object| object.object())
	}
}

impl<T: Attachable> Default for AttachmentPoint<T> {
	fn default() -> Self {
		Self { attached: None }
	}
}

impl<T: Attachable + fmt::Debug> fmt::Debug for AttachmentPoint<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("AttachmentPoint").field(&self.get()).finish()
	}
}

/// Handle of `object`, 0 for none.
pub fn object_or_zero<T: Attachable>(object: Option<&Arc<T>>) -> GLuint {
	object.map_or(0, |object| object.object())
}
