// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery threads and the re-entrancy flag that marks them.

use std::cell::Cell;
use std::thread;

use crate::error::{ReporterError, Result};
use crate::fault::panic_payload;

/// Name of the threads that run first attempts.
pub const DELIVERY_THREAD_NAME: &str = "crashpost-delivery";

thread_local! {
	static IN_DELIVERY: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is running reporting code.
///
/// The panic hook skips reporting for such threads so that a failure inside
/// the pipeline never feeds back into it.
pub fn in_delivery() -> bool {
	IN_DELIVERY.with(Cell::get)
}

/// Marks the current thread as a delivery thread until dropped.
pub struct DeliveryGuard {
	previous: bool,
}

impl DeliveryGuard {
	pub fn enter() -> Self {
		Self {
			previous: IN_DELIVERY.with(|flag| flag.replace(true)),
		}
	}
}

impl Drop for DeliveryGuard {
	fn drop(&mut self) {
		IN_DELIVERY.with(|flag| flag.set(self.previous));
	}
}

/// Run `f` on a fresh delivery thread and wait for it.
///
/// The thread has no async runtime context, so blocking transports are safe
/// to use from it regardless of where the caller runs.
pub fn run_on_delivery_thread<F, T>(f: F) -> Result<T>
where
	F: FnOnce() -> T + Send + 'static,
	T: Send + 'static,
{
	let handle = thread::Builder::new()
		.name(DELIVERY_THREAD_NAME.to_string())
		.spawn(move || {
			let _guard = DeliveryGuard::enter();
			f()
		})?;

	handle.join().map_err(|payload| {
		let (_, message) = panic_payload(payload.as_ref());
		ReporterError::DeliveryPanicked(message)
	})
}
