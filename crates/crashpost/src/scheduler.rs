// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The retry/backoff state machine for delivery tasks.
//!
//! Each call to [`DeliveryScheduler::run`] is one attempt:
//!
//! ```text
//! Pending -> InFlight -> Delivered
//!                     -> RetryScheduled -> (timer) -> InFlight
//!                     -> Discarded
//! ```
//!
//! The scheduler never sleeps. A retry hands the task to the
//! [`TimerFacility`] together with a callback that runs the next attempt.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crashpost_config::ReporterConfig;
use crashpost_core::{DeliveryError, DeliveryTask, Report, RouteDecision, RoutingPolicy};
use tracing::{debug, error, info, warn};

use crate::delivery::DeliveryGuard;
use crate::timer::{Redeliver, TimerFacility};
use crate::transport::Transport;

/// Why a task was dropped without being delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
	/// Automatic report on a newer platform with silent reporting disabled.
	Suppressed,
	/// The transport or the configuration failed in a way a retry cannot fix.
	NonRetryable(DeliveryError),
	/// A transient failure hit the retry bound.
	RetriesExhausted,
}

/// The state an attempt ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
	Delivered,
	RetryScheduled { retry_count: u32, delay: Duration },
	Discarded(DiscardReason),
}

pub struct DeliveryScheduler {
	config: Arc<ReporterConfig>,
	policy: RoutingPolicy,
	transport: Arc<dyn Transport>,
	timer: Arc<dyn TimerFacility>,
	this: Weak<Self>,
}

impl DeliveryScheduler {
	pub fn new(
		config: Arc<ReporterConfig>,
		transport: Arc<dyn Transport>,
		timer: Arc<dyn TimerFacility>,
	) -> Arc<Self> {
		Arc::new_cyclic(|this| Self {
			policy: config.routing_policy(),
			config,
			transport,
			timer,
			this: this.clone(),
		})
	}

	/// Wrap a fresh report in a task and run its first attempt.
	pub fn submit(&self, report: Report) -> AttemptOutcome {
		self.run(DeliveryTask::new(report))
	}

	/// Run one attempt of `task`.
	pub fn run(&self, mut task: DeliveryTask) -> AttemptOutcome {
		let task_id = task.id();
		let report = task.report();

		if task.is_first_attempt() && self.policy.check(report) == RouteDecision::Suppress {
			debug!(
				task_id = %task_id,
				exception_class = ?report.exception_class,
				platform_revision = ?report.platform_revision,
				"automatic report suppressed on newer platform"
			);
			return AttemptOutcome::Discarded(DiscardReason::Suppressed);
		}

		let target_url = match self.config.require_target_url() {
			Ok(url) => url,
			Err(e) => {
				error!(
					task_id = %task_id,
					error = %e,
					"cannot deliver report, discarding"
				);
				return AttemptOutcome::Discarded(DiscardReason::NonRetryable(e));
			}
		};

		debug!(
			task_id = %task_id,
			retry_count = task.retry_count(),
			"delivery attempt"
		);

		let err = match self
			.transport
			.send(report, target_url, &self.config.include_fields)
		{
			Ok(()) => {
				info!(
					task_id = %task_id,
					retry_count = task.retry_count(),
					exception_class = ?report.exception_class,
					"report delivered"
				);
				return AttemptOutcome::Delivered;
			}
			Err(e) => e,
		};

		if !err.is_retryable() {
			error!(
				task_id = %task_id,
				retry_count = task.retry_count(),
				exception_class = ?report.exception_class,
				error_kind = err.kind(),
				error = %err,
				"non-retryable delivery failure, discarding report"
			);
			return AttemptOutcome::Discarded(DiscardReason::NonRetryable(err));
		}

		let backoff = self.config.backoff;
		if backoff.is_exhausted(task.retry_count()) {
			warn!(
				task_id = %task_id,
				retry_count = task.retry_count(),
				exception_class = ?report.exception_class,
				error = %err,
				stack_trace = %report.stack_trace,
				"retries exhausted, discarding report"
			);
			return AttemptOutcome::Discarded(DiscardReason::RetriesExhausted);
		}

		let retry_count = task.advance_retry();
		let delay = backoff.delay_for(retry_count);
		warn!(
			task_id = %task_id,
			retry_count,
			delay_ms = delay.as_millis() as u64,
			error = %err,
			"delivery failed, retry scheduled"
		);
		self.timer.schedule(task, delay, self.redeliver());
		AttemptOutcome::RetryScheduled { retry_count, delay }
	}

	fn redeliver(&self) -> Redeliver {
		let this = self.this.clone();
		Arc::new(move |task: DeliveryTask| {
			let _guard = DeliveryGuard::enter();
			match this.upgrade() {
				Some(scheduler) => {
					scheduler.run(task);
				}
				None => debug!(task_id = %task.id(), "scheduler gone, dropping task"),
			}
		})
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crashpost_core::{Backoff, FieldFilter};
	use std::sync::Mutex;
	use tracing_test::traced_test;

	/// Transport that replays a fixed script of results, then keeps failing
	/// with the last one.
	pub(crate) struct ScriptedTransport {
		script: Mutex<Vec<Result<(), DeliveryError>>>,
		pub sent: Mutex<Vec<(Report, String, FieldFilter)>>,
	}

	impl ScriptedTransport {
		pub(crate) fn new(script: Vec<Result<(), DeliveryError>>) -> Self {
			Self {
				script: Mutex::new(script),
				sent: Mutex::new(Vec::new()),
			}
		}

		pub(crate) fn always(result: Result<(), DeliveryError>) -> Self {
			Self::new(vec![result])
		}

		pub(crate) fn calls(&self) -> usize {
			self.sent.lock().unwrap().len()
		}
	}

	impl Transport for ScriptedTransport {
		fn send(
			&self,
			report: &Report,
			target_url: &str,
			filter: &FieldFilter,
		) -> Result<(), DeliveryError> {
			self.sent
				.lock()
				.unwrap()
				.push((report.clone(), target_url.to_string(), filter.clone()));
			let mut script = self.script.lock().unwrap();
			if script.len() > 1 {
				script.remove(0)
			} else {
				script[0].clone()
			}
		}
	}

	/// Timer that records schedule calls instead of waiting.
	#[derive(Default)]
	pub(crate) struct RecordingTimer {
		pub scheduled: Mutex<Vec<(DeliveryTask, Duration, Redeliver)>>,
	}

	impl RecordingTimer {
		pub(crate) fn count(&self) -> usize {
			self.scheduled.lock().unwrap().len()
		}

		/// Pop the oldest scheduled callback and run it.
		pub(crate) fn fire_next(&self) -> Option<Duration> {
			let (task, delay, redeliver) = {
				let mut scheduled = self.scheduled.lock().unwrap();
				if scheduled.is_empty() {
					return None;
				}
				scheduled.remove(0)
			};
			redeliver(task);
			Some(delay)
		}
	}

	impl TimerFacility for RecordingTimer {
		fn schedule(&self, task: DeliveryTask, delay: Duration, redeliver: Redeliver) {
			self.scheduled.lock().unwrap().push((task, delay, redeliver));
		}
	}

	fn connection_refused() -> DeliveryError {
		DeliveryError::Io("connection refused".to_string())
	}

	fn report(manual: bool, platform_revision: &str) -> Report {
		Report {
			stack_trace: "panicked at src/main.rs:4:5:\nboom".to_string(),
			exception_class: Some("&str".to_string()),
			message: Some("boom".to_string()),
			thread_name: "main".to_string(),
			manual,
			platform_revision: Some(platform_revision.to_string()),
			..Default::default()
		}
	}

	fn scheduler(
		config: ReporterConfig,
		transport: &Arc<ScriptedTransport>,
		timer: &Arc<RecordingTimer>,
	) -> Arc<DeliveryScheduler> {
		DeliveryScheduler::new(
			Arc::new(config),
			Arc::clone(transport) as Arc<dyn Transport>,
			Arc::clone(timer) as Arc<dyn TimerFacility>,
		)
	}

	fn config() -> ReporterConfig {
		ReporterConfig::new("https://collector.example.com/report")
	}

	#[test]
	fn success_is_delivered() {
		let transport = Arc::new(ScriptedTransport::always(Ok(())));
		let timer = Arc::new(RecordingTimer::default());
		let outcome = scheduler(config(), &transport, &timer).submit(report(false, "7"));

		assert_eq!(outcome, AttemptOutcome::Delivered);
		assert_eq!(transport.calls(), 1);
		assert_eq!(timer.count(), 0);
		let sent = transport.sent.lock().unwrap();
		assert_eq!(sent[0].1, "https://collector.example.com/report");
	}

	#[test]
	fn first_retryable_failure_schedules_two_seconds() {
		let transport = Arc::new(ScriptedTransport::always(Err(connection_refused())));
		let timer = Arc::new(RecordingTimer::default());
		let outcome = scheduler(config(), &transport, &timer).submit(report(false, "7"));

		assert_eq!(
			outcome,
			AttemptOutcome::RetryScheduled {
				retry_count: 1,
				delay: Duration::from_millis(2000),
			}
		);
		let scheduled = timer.scheduled.lock().unwrap();
		assert_eq!(scheduled.len(), 1);
		assert_eq!(scheduled[0].0.retry_count(), 1);
		assert_eq!(scheduled[0].1, Duration::from_millis(2000));
	}

	#[test]
	fn defaults_give_eighteen_attempts_then_discard() {
		let transport = Arc::new(ScriptedTransport::always(Err(connection_refused())));
		let timer = Arc::new(RecordingTimer::default());
		let scheduler = scheduler(config(), &transport, &timer);

		let first = scheduler.submit(report(false, "7"));
		assert!(matches!(first, AttemptOutcome::RetryScheduled { .. }));

		let mut delays = Vec::new();
		while let Some(delay) = timer.fire_next() {
			delays.push(delay);
		}

		assert_eq!(transport.calls(), 18);
		assert_eq!(delays.len(), 17);
		assert_eq!(delays[0], Duration::from_secs(2));
		assert_eq!(delays[11], Duration::from_secs(4096));
		assert!(delays[12..].iter().all(|d| *d == Duration::from_secs(4096)));
		assert_eq!(timer.count(), 0);
	}

	#[test]
	fn exhausted_task_is_discarded_without_schedule() {
		let transport = Arc::new(ScriptedTransport::always(Err(connection_refused())));
		let timer = Arc::new(RecordingTimer::default());
		let scheduler = scheduler(config(), &transport, &timer);

		let task = DeliveryTask::resume(Default::default(), report(false, "7"), 17);
		assert_eq!(
			scheduler.run(task),
			AttemptOutcome::Discarded(DiscardReason::RetriesExhausted)
		);
		assert_eq!(timer.count(), 0);
	}

	#[test]
	#[traced_test]
	fn exhausted_task_logs_one_warning_with_stack_trace() {
		let transport = Arc::new(ScriptedTransport::always(Err(connection_refused())));
		let timer = Arc::new(RecordingTimer::default());
		let scheduler = scheduler(config(), &transport, &timer);

		let report = Report {
			stack_trace: "panicked at src/sync.rs:9:13: disk full".to_string(),
			..report(false, "7")
		};
		let task = DeliveryTask::resume(Default::default(), report, 17);
		assert_eq!(
			scheduler.run(task),
			AttemptOutcome::Discarded(DiscardReason::RetriesExhausted)
		);
		assert_eq!(timer.count(), 0);

		assert!(logs_contain("retries exhausted, discarding report"));
		logs_assert(|lines: &[&str]| {
			let warnings: Vec<&&str> = lines.iter().filter(|l| l.contains(" WARN ")).collect();
			match warnings.as_slice() {
				[line] if line.contains("stack_trace=panicked at src/sync.rs:9:13: disk full") => Ok(()),
				[line] => Err(format!("warning is missing the stack trace: {line}")),
				other => Err(format!("expected one warning, got {}", other.len())),
			}
		});
	}

	#[test]
	fn permission_denied_is_discarded_on_first_attempt() {
		let denied = DeliveryError::PermissionDenied("socket: Permission denied".to_string());
		let transport = Arc::new(ScriptedTransport::always(Err(denied.clone())));
		let timer = Arc::new(RecordingTimer::default());
		let outcome = scheduler(config(), &transport, &timer).submit(report(false, "7"));

		assert_eq!(
			outcome,
			AttemptOutcome::Discarded(DiscardReason::NonRetryable(denied))
		);
		assert_eq!(transport.calls(), 1);
		assert_eq!(timer.count(), 0);
	}

	#[test]
	fn suppressed_report_never_reaches_transport() {
		let transport = Arc::new(ScriptedTransport::always(Ok(())));
		let timer = Arc::new(RecordingTimer::default());
		let outcome = scheduler(config(), &transport, &timer).submit(report(false, "34"));

		assert_eq!(outcome, AttemptOutcome::Discarded(DiscardReason::Suppressed));
		assert_eq!(transport.calls(), 0);
	}

	#[test]
	fn manual_report_is_sent_on_newer_platform() {
		let transport = Arc::new(ScriptedTransport::always(Ok(())));
		let timer = Arc::new(RecordingTimer::default());
		let outcome = scheduler(config(), &transport, &timer).submit(report(true, "34"));
		assert_eq!(outcome, AttemptOutcome::Delivered);
	}

	#[test]
	fn report_on_new_platforms_allows_automatic_reports() {
		let transport = Arc::new(ScriptedTransport::always(Ok(())));
		let timer = Arc::new(RecordingTimer::default());
		let config = ReporterConfig {
			report_on_new_platforms: true,
			..config()
		};
		let outcome = scheduler(config, &transport, &timer).submit(report(false, "34"));
		assert_eq!(outcome, AttemptOutcome::Delivered);
	}

	#[test]
	fn suppression_is_only_checked_on_first_attempt() {
		let transport = Arc::new(ScriptedTransport::always(Ok(())));
		let timer = Arc::new(RecordingTimer::default());
		let task = DeliveryTask::resume(Default::default(), report(false, "34"), 3);
		let outcome = scheduler(config(), &transport, &timer).run(task);
		assert_eq!(outcome, AttemptOutcome::Delivered);
	}

	#[test]
	fn missing_target_url_is_discarded() {
		let transport = Arc::new(ScriptedTransport::always(Ok(())));
		let timer = Arc::new(RecordingTimer::default());
		let outcome =
			scheduler(ReporterConfig::default(), &transport, &timer).submit(report(false, "7"));

		assert_eq!(
			outcome,
			AttemptOutcome::Discarded(DiscardReason::NonRetryable(
				DeliveryError::MissingTargetUrl
			))
		);
		assert_eq!(transport.calls(), 0);
		assert_eq!(timer.count(), 0);
	}

	#[test]
	fn recovers_after_transient_failures() {
		let transport = Arc::new(ScriptedTransport::new(vec![
			Err(connection_refused()),
			Err(connection_refused()),
			Ok(()),
		]));
		let timer = Arc::new(RecordingTimer::default());
		let scheduler = scheduler(config(), &transport, &timer);

		scheduler.submit(report(false, "7"));
		assert_eq!(timer.fire_next(), Some(Duration::from_secs(2)));
		assert_eq!(timer.fire_next(), Some(Duration::from_secs(4)));
		assert_eq!(timer.fire_next(), None);
		assert_eq!(transport.calls(), 3);
	}

	#[test]
	fn retries_resend_the_same_report() {
		let transport = Arc::new(ScriptedTransport::new(vec![Err(connection_refused()), Ok(())]));
		let timer = Arc::new(RecordingTimer::default());
		let scheduler = scheduler(config(), &transport, &timer);

		scheduler.submit(report(false, "7"));
		timer.fire_next();

		let sent = transport.sent.lock().unwrap();
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0].0, sent[1].0);
	}

	#[test]
	fn custom_backoff_bounds_attempts() {
		let transport = Arc::new(ScriptedTransport::always(Err(connection_refused())));
		let timer = Arc::new(RecordingTimer::default());
		let config = ReporterConfig {
			backoff: Backoff {
				max_retry_count: 2,
				max_backoff_exponent: 1,
			},
			..config()
		};
		let scheduler = scheduler(config, &transport, &timer);

		scheduler.submit(report(false, "7"));
		let mut delays = Vec::new();
		while let Some(delay) = timer.fire_next() {
			delays.push(delay);
		}
		assert_eq!(transport.calls(), 3);
		assert_eq!(delays, vec![Duration::from_secs(2), Duration::from_secs(2)]);
	}

	#[test]
	fn dropped_scheduler_abandons_pending_retry() {
		let transport = Arc::new(ScriptedTransport::always(Err(connection_refused())));
		let timer = Arc::new(RecordingTimer::default());
		let scheduler = scheduler(config(), &transport, &timer);

		scheduler.submit(report(false, "7"));
		drop(scheduler);
		assert!(timer.fire_next().is_some());
		assert_eq!(transport.calls(), 1);
	}
}
