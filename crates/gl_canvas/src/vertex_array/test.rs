use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{AttributeType, GlType, VertexArrayState, VertexArrayType, VertexAttribFormat};
use crate::{
	driver::fake::FakeDriver,
	object::{Buffer, ObjectKind},
};

fn float_format(size: i32, stride: i32) -> VertexAttribFormat {
	VertexAttribFormat {
		bytes_per_element: AttributeType::Float.bytes_per_element(size),
		size,
		ty: AttributeType::Float,
		normalized: false,
		stride,
		offset: 0,
		is_integer: false,
	}
}

fn scan(array: &VertexArrayState) -> bool {
	(0..array.max_vertex_attribs()).all(|index| array.vertex_attrib_state(index).validate_binding())
}

/// Slots across `arrays` referencing `buffer`.
fn references(arrays: &[VertexArrayState], buffer: &Arc<Buffer>) -> u32 {
	let mut count = 0;
	for array in arrays {
		if array.get_element_array_buffer().is_some_and(|bound| Arc::ptr_eq(&bound, buffer)) {
			count += 1;
		}
		for index in 0..array.max_vertex_attribs() {
			let info = array.vertex_attrib_state(index);
			if info.buffer.is_some_and(|bound| Arc::ptr_eq(&bound, buffer)) {
				count += 1;
			}
		}
	}
	count
}

#[test]
fn attribute_types() {
	assert_eq!(AttributeType::of::<f32>(), AttributeType::Float);
	assert_eq!(AttributeType::of::<u16>(), AttributeType::UnsignedShort);
	assert_eq!(<i8 as GlType>::ATTRIBUTE_TYPE, AttributeType::Byte);

	assert_eq!(AttributeType::of::<u32>().size() as usize, std::mem::size_of::<u32>());
	assert_eq!(AttributeType::of::<i16>().size() as usize, std::mem::size_of::<i16>());

	assert_eq!(AttributeType::Float.bytes_per_element(3), 12);
	assert_eq!(AttributeType::Int2101010Rev.bytes_per_element(4), 4);
	assert!(AttributeType::UnsignedByte.is_integer());
	assert!(!AttributeType::HalfFloat.is_integer());
	assert_eq!(AttributeType::HalfFloat.gl_type(), gl::HALF_FLOAT);
}

#[test]
fn default_slots() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver, 16);

	assert_eq!(array.ty(), VertexArrayType::User);
	assert_eq!(array.max_vertex_attribs(), 16);
	assert!(array.get_element_array_buffer().is_none());

	let info = array.vertex_attrib_state(15);
	assert!(!info.enabled);
	assert!(info.buffer.is_none());
	assert_eq!(info.size, 4);
	assert_eq!(info.ty, AttributeType::Float);
	assert_eq!(info.stride, 16);
	assert_eq!(info.original_stride, 0);
	assert_eq!(info.divisor, 0);

	assert!(array.are_all_enabled_attrib_buffers_bound());
}

#[test]
fn zero_stride_is_tightly_packed() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);
	let buffer = Buffer::create(&driver);

	array.set_vertex_attrib_state(2, float_format(3, 0), Some(buffer));

	let info = array.vertex_attrib_state(2);
	assert_eq!(info.bytes_per_element, 12);
	assert_eq!(info.stride, 12);
	assert_eq!(info.original_stride, 0);

	array.set_vertex_attrib_state(2, float_format(3, 20), None);
	let info = array.vertex_attrib_state(2);
	assert_eq!(info.stride, 20);
	assert_eq!(info.original_stride, 20);
}

#[test]
fn enable_bind_delete_cycle() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);

	array.set_vertex_attrib_enabled(3, true);
	assert!(!array.are_all_enabled_attrib_buffers_bound());

	let buffer = Buffer::create(&driver);
	array.set_vertex_attrib_state(3, float_format(4, 0), Some(buffer.clone()));
	assert!(array.are_all_enabled_attrib_buffers_bound());
	assert_eq!(buffer.attachment_count(), 1);

	buffer.delete_object();
	array.unbind_buffer(&buffer);
	assert!(!array.are_all_enabled_attrib_buffers_bound());
	assert_eq!(buffer.attachment_count(), 0);
	assert_eq!(buffer.object(), 0);
}

#[test]
fn fixing_one_slot_leaves_others_broken() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);
	let buffer = Buffer::create(&driver);

	array.set_vertex_attrib_enabled(0, true);
	array.set_vertex_attrib_enabled(1, true);
	assert!(!array.are_all_enabled_attrib_buffers_bound());

	array.set_vertex_attrib_state(0, float_format(2, 0), Some(buffer.clone()));
	assert!(!array.are_all_enabled_attrib_buffers_bound());

	array.set_vertex_attrib_enabled(1, false);
	assert!(array.are_all_enabled_attrib_buffers_bound());
}

#[test]
fn zero_handle_buffer_is_not_bound() {
	let (fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);

	fake.state().fail_allocations = true;
	let buffer = Buffer::create(&driver);
	fake.state().fail_allocations = false;

	array.set_vertex_attrib_state(0, float_format(4, 0), Some(buffer.clone()));
	assert!(array.are_all_enabled_attrib_buffers_bound());

	array.set_vertex_attrib_enabled(0, true);
	assert!(!array.are_all_enabled_attrib_buffers_bound());
	assert!(array.has_array_buffer(&buffer));
}

#[test]
fn divisor_leaves_binding_state_alone() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver, 16);

	array.set_vertex_attrib_enabled(5, true);
	assert!(!array.are_all_enabled_attrib_buffers_bound());

	array.set_vertex_attrib_divisor(5, 3);
	assert_eq!(array.vertex_attrib_state(5).divisor, 3);
	assert!(!array.are_all_enabled_attrib_buffers_bound());
}

#[test]
fn element_array_binding() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);
	let indices = Buffer::create(&driver);
	let other = Buffer::create(&driver);

	array.set_element_array_buffer(Some(indices.clone()));
	assert_eq!(indices.attachment_count(), 1);
	assert!(!array.has_array_buffer(&indices));

	array.set_element_array_buffer(Some(other.clone()));
	assert_eq!(indices.attachment_count(), 0);
	assert_eq!(other.attachment_count(), 1);

	array.unbind_buffer(&other);
	assert!(array.get_element_array_buffer().is_none());
	assert_eq!(other.attachment_count(), 0);
}

#[test]
fn rebinding_a_deleted_buffer_keeps_it_alive() {
	let (fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);
	let buffer = Buffer::create(&driver);
	let object = buffer.object();

	array.set_vertex_attrib_state(2, float_format(4, 0), Some(buffer.clone()));
	array.set_element_array_buffer(Some(buffer.clone()));
	buffer.delete_object();
	assert_eq!(buffer.attachment_count(), 2);

	// the same buffer replaces itself in both slots
	array.set_vertex_attrib_state(2, float_format(2, 8), Some(buffer.clone()));
	array.set_element_array_buffer(Some(buffer.clone()));
	assert_eq!(buffer.object(), object);
	assert_eq!(buffer.attachment_count(), 2);
	assert_eq!(fake.release_count(ObjectKind::Buffer, object), 0);
	assert_eq!(array.vertex_attrib_state(2).stride, 8);

	array.set_vertex_attrib_state(2, float_format(4, 0), None);
	assert_eq!(fake.release_count(ObjectKind::Buffer, object), 0);

	array.set_element_array_buffer(None);
	assert_eq!(buffer.object(), 0);
	assert_eq!(fake.release_count(ObjectKind::Buffer, object), 1);
}

#[test]
fn unbind_clears_every_slot() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);
	let buffer = Buffer::create(&driver);

	for index in [1, 4, 9] {
		array.set_vertex_attrib_state(index, float_format(4, 0), Some(buffer.clone()));
	}
	array.set_element_array_buffer(Some(buffer.clone()));
	assert_eq!(buffer.attachment_count(), 4);

	array.unbind_buffer(&buffer);
	assert_eq!(buffer.attachment_count(), 0);
	assert!(!array.has_array_buffer(&buffer));
}

#[test]
fn default_array_lifecycle() {
	let (fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_default(driver, 16);

	assert!(array.is_default());
	assert_eq!(array.object(), 0);
	assert!(array.is_usable());
	assert!(!array.is_initialized());

	array.did_bind();
	assert!(array.is_initialized());

	array.delete_object();
	assert!(array.is_usable());
	assert!(fake.state().live.is_empty());
}

#[test]
fn deleting_user_array_drops_bindings() {
	let (fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver.clone(), 16);
	let object = array.object();
	let buffer = Buffer::create(&driver);
	assert!(array.is_usable());

	array.set_vertex_attrib_state(0, float_format(4, 0), Some(buffer.clone()));
	array.set_element_array_buffer(Some(buffer.clone()));

	array.delete_object();
	assert!(!array.is_usable());
	assert_eq!(buffer.attachment_count(), 0);
	assert_eq!(fake.release_count(ObjectKind::VertexArray, object), 1);
}

#[test]
#[should_panic]
fn attribute_index_out_of_range() {
	let (_fake, driver) = FakeDriver::shared();
	let array = VertexArrayState::new_user(driver, 16);
	array.set_vertex_attrib_enabled(16, true);
}

/// Random enable/state/unbind sequences over several arrays sharing a pool
/// of buffers, checking the cache and the attachment counts after each step.
#[test]
fn random_sequences_match_full_scan() {
	let (fake, driver) = FakeDriver::shared();
	let mut rng = StdRng::seed_from_u64(0x5eed);

	let mut buffers = (0..6).map(|_| Buffer::create(&driver)).collect::<Vec<_>>();
	fake.state().fail_allocations = true;
	buffers.push(Buffer::create(&driver));
	fake.state().fail_allocations = false;

	let arrays = (0..3).map(|_| VertexArrayState::new_user(driver.clone(), 8)).collect::<Vec<_>>();

	for _ in 0..2000 {
		let array = &arrays[rng.gen_range(0..arrays.len())];
		let index = rng.gen_range(0..8);

		match rng.gen_range(0..10) {
			0..=2 => array.set_vertex_attrib_enabled(index, rng.gen()),
			3..=5 => {
				let buffer = match rng.gen_bool(0.8) {
					true => Some(buffers[rng.gen_range(0..buffers.len())].clone()),
					false => None,
				};
				array.set_vertex_attrib_state(index, float_format(rng.gen_range(1..=4), 0), buffer);
			},
			6 => {
				let buffer = &buffers[rng.gen_range(0..buffers.len())];
				array.unbind_buffer(buffer);
			},
			7 => {
				let buffer = match rng.gen_bool(0.7) {
					true => Some(buffers[rng.gen_range(0..buffers.len())].clone()),
					false => None,
				};
				array.set_element_array_buffer(buffer);
			},
			8 => array.set_vertex_attrib_divisor(index, rng.gen_range(0..4)),
			_ => {
				// replace a buffer with a fresh one, deleting the old one everywhere
				let slot = rng.gen_range(0..buffers.len());
				let old = std::mem::replace(&mut buffers[slot], Buffer::create(&driver));
				for array in &arrays {
					array.unbind_buffer(&old);
				}
				old.delete_object();
				assert_eq!(old.object(), 0);
			},
		}

		if rng.gen_bool(0.5) {
			for array in &arrays {
				assert_eq!(array.are_all_enabled_attrib_buffers_bound(), scan(array));
			}
		}

		for buffer in &buffers {
			assert_eq!(buffer.attachment_count(), references(&arrays, buffer));
		}
	}

	for array in &arrays {
		assert_eq!(array.are_all_enabled_attrib_buffers_bound(), scan(array));
	}

	drop(arrays);
	for buffer in &buffers {
		assert_eq!(buffer.attachment_count(), 0);
	}
}

#[test]
fn concurrent_mutation_keeps_counts() {
	let (_fake, driver) = FakeDriver::shared();
	let array = Arc::new(VertexArrayState::new_user(driver.clone(), 16));
	let buffers = (0..4).map(|_| Buffer::create(&driver)).collect::<Vec<_>>();

	std::thread::scope(|scope| {
		for seed in 0..4 {
			let array = &array;
			let buffers = &buffers;
			scope.spawn(move || {
				let mut rng = StdRng::seed_from_u64(seed);
				for _ in 0..500 {
					let index = rng.gen_range(0..16);
					match rng.gen_range(0..4) {
						0 => array.set_vertex_attrib_enabled(index, rng.gen()),
						1 => {
							let buffer = buffers[rng.gen_range(0..buffers.len())].clone();
							array.set_vertex_attrib_state(index, float_format(4, 0), Some(buffer));
						},
						2 => {
							let buffer = buffers[rng.gen_range(0..buffers.len())].clone();
							array.set_element_array_buffer(Some(buffer));
						},
						_ => {
							array.are_all_enabled_attrib_buffers_bound();
						},
					}
				}
			});
		}
	});

	assert_eq!(array.are_all_enabled_attrib_buffers_bound(), scan(&array));
	let arrays = std::slice::from_ref(&*array);
	for buffer in &buffers {
		assert_eq!(buffer.attachment_count(), references(arrays, buffer));
	}
}
