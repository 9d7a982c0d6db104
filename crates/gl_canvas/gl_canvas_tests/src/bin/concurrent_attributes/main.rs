// Copyright (C) 2022 the ITK authors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/./

//! Mutate one vertex array from several threads at once
//!
//! After every round the binding cache is checked against a full scan and
//! every buffer's attachment count against the slots referencing it. The
//! window turns red on the first mismatch.

use std::sync::Arc;

use gl_canvas::{
	driver::BufferTarget,
	framebuffer::BufferMask,
	object::Buffer,
	vertex_array::{AttributeType, VertexArrayState, VertexAttribFormat},
	ContextAttributes,
	RenderingContext,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const THREADS: u64 = 4;
const OPERATIONS: usize = 1000;
const BUFFERS: usize = 6;

fn format(rng: &mut StdRng) -> VertexAttribFormat {
	let size = rng.gen_range(1..=4);
	VertexAttribFormat {
		bytes_per_element: AttributeType::Float.bytes_per_element(size),
		size,
		ty: AttributeType::Float,
		normalized: false,
		stride: 0,
		offset: 0,
		is_integer: false,
	}
}

fn mutate(array: &VertexArrayState, buffers: &[Arc<Buffer>], seed: u64) {
	let mut rng = StdRng::seed_from_u64(seed);
	let attribs = array.max_vertex_attribs();

	for _ in 0..OPERATIONS {
		let index = rng.gen_range(0..attribs);
		let buffer = match rng.gen_bool(0.8) {
			true => Some(buffers[rng.gen_range(0..buffers.len())].clone()),
			false => None,
		};

		match rng.gen_range(0..5) {
			0 => array.set_vertex_attrib_enabled(index, rng.gen()),
			1 => array.set_vertex_attrib_state(index, format(&mut rng), buffer),
			2 => array.set_element_array_buffer(buffer),
			3 => array.set_vertex_attrib_divisor(index, rng.gen_range(0..2)),
			_ => {
				array.are_all_enabled_attrib_buffers_bound();
			},
		}
	}
}

fn consistent(array: &VertexArrayState, buffers: &[Arc<Buffer>]) -> bool {
	let slots = (0..array.max_vertex_attribs())
		.map(|index| array.vertex_attrib_state(index))
		.collect::<Vec<_>>();

	let scan = slots.iter().all(|slot| slot.validate_binding());
	if array.are_all_enabled_attrib_buffers_bound() != scan {
		log::error!("binding cache disagrees with a full scan ({scan})");
		return false
	}

	let element_array = array.get_element_array_buffer();
	for buffer in buffers {
		let mut references = slots
			.iter()
			.filter(|slot| slot.buffer.as_ref().is_some_and(|bound| Arc::ptr_eq(bound, buffer)))
			.count() as u32;
		if element_array.as_ref().is_some_and(|bound| Arc::ptr_eq(bound, buffer)) {
			references += 1;
		}

		if buffer.attachment_count() != references {
			log::error!(
				"buffer {} has {} attachments but {} references",
				buffer.object(),
				buffer.attachment_count(),
				references,
			);
			return false
		}
	}

	true
}

fn main() {
	gl_canvas_tests::view_window(false, |driver, size| {
		let mut context = RenderingContext::new(driver, ContextAttributes::default(), size).unwrap();
		let array = context.create_vertex_array().unwrap();
		context.bind_vertex_array(Some(&array)).unwrap();

		let mut buffers = (0..BUFFERS)
			.map(|_| context.create_buffer().unwrap())
			.collect::<Vec<_>>();

		let mut round = 0u64;
		let mut failed = false;

		// loop
		move |resized| {
			if let Some(size) = resized {
				context.reshape(size).unwrap();
			}
			context.prepare_for_display().unwrap();

			if !failed {
				std::thread::scope(|scope| {
					for thread in 0..THREADS {
						let array = &array;
						let buffers = &buffers;
						scope.spawn(move || mutate(array, buffers, round * THREADS + thread));
					}
				});

				failed = !consistent(&array, &buffers);

				// delete one buffer through the context and replace it
				let slot = round as usize % buffers.len();
				let replacement = context.create_buffer().unwrap();
				let deleted = std::mem::replace(&mut buffers[slot], replacement);
				context.bind_buffer(BufferTarget::Array, Some(&deleted)).unwrap();
				context.delete_buffer(&deleted).unwrap();
				failed |= array.has_array_buffer(&deleted) || deleted.attachment_count() != 0;

				if round % 100 == 0 {
					log::info!("round {round} consistent: {}", !failed);
				}
				round += 1;
			}

			match failed {
				true => unsafe { gl::ClearColor(0.8, 0.1, 0.1, 1.0) },
				false => unsafe { gl::ClearColor(0.1, 0.6, 0.2, 1.0) },
			}
			context.clear(BufferMask::COLOR).unwrap();

			gl_canvas_tests::present(&context);
		}
	});
}
