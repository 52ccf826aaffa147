// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deferred re-invocation of delivery tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crashpost_core::{DeliveryTask, TaskId};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Callback that runs one more attempt for a task.
pub type Redeliver = Arc<dyn Fn(DeliveryTask) + Send + Sync>;

/// Schedules a one-shot callback no earlier than `delay`.
///
/// Callbacks are keyed by [`DeliveryTask::id`]; scheduling a task whose id is
/// already pending supersedes the earlier callback.
pub trait TimerFacility: Send + Sync {
	fn schedule(&self, task: DeliveryTask, delay: Duration, redeliver: Redeliver);
}

struct PendingCallback {
	generation: u64,
	handle: JoinHandle<()>,
}

type PendingMap = Mutex<HashMap<TaskId, PendingCallback>>;

/// [`TimerFacility`] backed by a tokio runtime.
///
/// The wait is a `tokio::time::sleep`; the attempt itself runs on the blocking
/// pool because transports block.
pub struct TokioTimer {
	handle: Handle,
	pending: Arc<PendingMap>,
	generation: AtomicU64,
}

impl TokioTimer {
	pub fn new(handle: Handle) -> Self {
		Self {
			handle,
			pending: Arc::new(Mutex::new(HashMap::new())),
			generation: AtomicU64::new(0),
		}
	}

	/// Timer on the runtime the caller is running in, if any.
	pub fn current() -> Option<Self> {
		Handle::try_current().ok().map(Self::new)
	}

	/// Number of callbacks waiting to fire.
	pub fn pending(&self) -> usize {
		lock(&self.pending).len()
	}

	/// Abort every waiting callback. Attempts already running are not interrupted.
	pub fn cancel_all(&self) {
		let drained: Vec<_> = lock(&self.pending).drain().collect();
		for (task_id, callback) in drained {
			debug!(task_id = %task_id, "cancelling scheduled redelivery");
			callback.handle.abort();
		}
	}
}

impl TimerFacility for TokioTimer {
	fn schedule(&self, task: DeliveryTask, delay: Duration, redeliver: Redeliver) {
		let task_id = task.id();
		let generation = self.generation.fetch_add(1, Ordering::Relaxed);
		let pending = Arc::clone(&self.pending);

		// Held across spawn and insert so the callback cannot look itself up early.
		let mut guard = lock(&self.pending);

		let handle = self.handle.spawn(async move {
			tokio::time::sleep(delay).await;

			{
				let mut guard = lock(&pending);
				if guard
					.get(&task_id)
					.is_some_and(|p| p.generation == generation)
				{
					guard.remove(&task_id);
				}
			}

			if let Err(e) = tokio::task::spawn_blocking(move || redeliver(task)).await {
				error!(task_id = %task_id, error = %e, "redelivery worker failed");
			}
		});

		if let Some(previous) = guard.insert(task_id, PendingCallback { generation, handle }) {
			debug!(task_id = %task_id, "superseding pending redelivery");
			previous.handle.abort();
		}

		debug!(
			task_id = %task_id,
			delay_ms = delay.as_millis() as u64,
			"redelivery scheduled"
		);
	}
}

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<TaskId, PendingCallback>> {
	pending.lock().unwrap_or_else(|e| e.into_inner())
}
