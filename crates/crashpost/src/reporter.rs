// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The reporter facade: capture, route and deliver.

use std::error::Error as StdError;
use std::sync::Arc;

use crashpost_config::ReporterConfig;
use crashpost_core::{PromptText, Report, Route, RoutingPolicy};
use tracing::{debug, info};

use crate::builder::{current_thread_name, ReportBuilder};
use crate::delivery::run_on_delivery_thread;
use crate::environment::{AppInfo, EnvironmentInfoProvider, HostEnvironment};
use crate::error::{ReporterError, Result};
use crate::fault::Fault;
use crate::interceptor::FaultInterceptor;
use crate::prompt::PromptHandler;
use crate::scheduler::{AttemptOutcome, DeliveryScheduler};
use crate::timer::{TimerFacility, TokioTimer};
use crate::transport::{HttpTransport, Transport};

/// What happened to a captured report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
	/// Handed to the [`PromptHandler`]; delivery waits for the user.
	Prompted,
	/// The first delivery attempt ran.
	Attempted(AttemptOutcome),
}

/// Builder for constructing a [`Reporter`].
pub struct ReporterBuilder {
	config: Option<ReporterConfig>,
	app_info: Option<AppInfo>,
	environment: Option<Arc<dyn EnvironmentInfoProvider>>,
	transport: Option<Arc<dyn Transport>>,
	timer: Option<Arc<dyn TimerFacility>>,
	prompt: Option<Arc<dyn PromptHandler>>,
}

impl ReporterBuilder {
	pub fn new() -> Self {
		Self {
			config: None,
			app_info: None,
			environment: None,
			transport: None,
			timer: None,
			prompt: None,
		}
	}

	/// Use this configuration instead of loading it from the standard sources.
	pub fn config(mut self, config: ReporterConfig) -> Self {
		self.config = Some(config);
		self
	}

	/// Application descriptors for the default [`HostEnvironment`].
	///
	/// Typically `crashpost::app_info!()` expanded in the host crate.
	pub fn app_info(mut self, app_info: AppInfo) -> Self {
		self.app_info = Some(app_info);
		self
	}

	pub fn environment(mut self, environment: Arc<dyn EnvironmentInfoProvider>) -> Self {
		self.environment = Some(environment);
		self
	}

	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Timer used for retries. Defaults to a [`TokioTimer`] on the current runtime.
	pub fn timer(mut self, timer: Arc<dyn TimerFacility>) -> Self {
		self.timer = Some(timer);
		self
	}

	pub fn prompt_handler(mut self, prompt: Arc<dyn PromptHandler>) -> Self {
		self.prompt = Some(prompt);
		self
	}

	/// Builds the reporter.
	///
	/// Without an explicit config, [`crashpost_config::load_config`] is used.
	/// Without an explicit timer, this must run inside a tokio runtime.
	pub fn build(self) -> Result<Reporter> {
		let config = match self.config {
			Some(config) => config,
			None => crashpost_config::load_config()?,
		};

		let timer: Arc<dyn TimerFacility> = match self.timer {
			Some(timer) => timer,
			None => Arc::new(TokioTimer::current().ok_or(ReporterError::NoTimerFacility)?),
		};

		let environment: Arc<dyn EnvironmentInfoProvider> = match self.environment {
			Some(environment) => environment,
			None => {
				let app = self.app_info.unwrap_or_else(|| crate::app_info!());
				Arc::new(HostEnvironment::new(app))
			}
		};

		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new(config.request_timeout)),
		};

		let config = Arc::new(config);
		let scheduler = DeliveryScheduler::new(Arc::clone(&config), transport, timer);

		info!(
			target_url = ?config.target_url,
			interactive = self.prompt.is_some(),
			max_attempts = config.backoff.total_attempts(),
			retry_window_secs = config.backoff.total_delay().as_secs(),
			"Reporter initialized"
		);

		Ok(Reporter {
			inner: Arc::new(ReporterInner {
				builder: ReportBuilder::new(environment),
				config,
				scheduler,
				prompt: self.prompt,
			}),
		})
	}
}

impl Default for ReporterBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct ReporterInner {
	config: Arc<ReporterConfig>,
	builder: ReportBuilder,
	scheduler: Arc<DeliveryScheduler>,
	prompt: Option<Arc<dyn PromptHandler>>,
}

/// Captures faults and delivers reports to the collector.
///
/// # Example
///
/// ```ignore
/// use crashpost::Reporter;
///
/// let reporter = Reporter::builder()
///     .app_info(crashpost::app_info!())
///     .build()?;
///
/// // Report panics from any thread.
/// reporter.install_panic_hook();
///
/// // Report a recoverable error by hand.
/// if let Err(e) = sync_notes() {
///     reporter.report_error(&e, Some("sync after resume".into()))?;
/// }
/// ```
#[derive(Clone)]
pub struct Reporter {
	inner: Arc<ReporterInner>,
}

impl Reporter {
	pub fn builder() -> ReporterBuilder {
		ReporterBuilder::new()
	}

	pub fn config(&self) -> &ReporterConfig {
		&self.inner.config
	}

	/// The copy a [`PromptHandler`] should render.
	pub fn prompt_text(&self) -> &PromptText {
		&self.inner.config.prompt
	}

	/// Installs the process-wide panic hook reporting through this reporter.
	pub fn install_panic_hook(&self) -> Arc<FaultInterceptor> {
		FaultInterceptor::install(self.clone())
	}

	/// Build a report for `fault` without sending it.
	pub fn capture(
		&self,
		fault: &Fault,
		thread_name: &str,
		extra_message: Option<String>,
		manual: bool,
	) -> Report {
		self
			.inner
			.builder
			.build(fault, thread_name, extra_message, manual)
	}

	/// Route a report: prompt when a UI is registered and the report is
	/// automatic, otherwise run the first delivery attempt.
	pub fn dispatch(&self, report: Report) -> Result<Dispatch> {
		if self.try_prompt(&report) {
			return Ok(Dispatch::Prompted);
		}
		self.submit(report).map(Dispatch::Attempted)
	}

	/// [`Reporter::dispatch`] for callers already on a delivery thread.
	pub(crate) fn dispatch_in_place(&self, report: Report) -> Dispatch {
		if self.try_prompt(&report) {
			return Dispatch::Prompted;
		}
		Dispatch::Attempted(self.inner.scheduler.submit(report))
	}

	fn try_prompt(&self, report: &Report) -> bool {
		let Some(prompt) = &self.inner.prompt else {
			return false;
		};
		if RoutingPolicy::route(report.manual, true) != Route::Prompt {
			return false;
		}
		if prompt.present(report) {
			debug!(exception_class = ?report.exception_class, "report handed to prompt");
			return true;
		}
		debug!("prompt declined, delivering silently");
		false
	}

	/// Run the first delivery attempt for `report` on a delivery thread.
	///
	/// Retries continue in the background through the timer facility.
	pub fn submit(&self, report: Report) -> Result<AttemptOutcome> {
		let scheduler = Arc::clone(&self.inner.scheduler);
		run_on_delivery_thread(move || scheduler.submit(report))
	}

	/// Deliver a report the user confirmed, with an optional comment.
	pub fn deliver(&self, report: Report, extra_message: Option<String>) -> Result<AttemptOutcome> {
		let report = report.into_manual().with_extra_message(extra_message);
		self.submit(report)
	}

	/// Report a recoverable error from the calling thread.
	pub fn report_error<E>(&self, error: &E, extra_message: Option<String>) -> Result<Dispatch>
	where
		E: StdError + 'static,
	{
		let fault = Fault::from_error(error);
		let report = self.capture(&fault, &current_thread_name(), extra_message, false);
		self.dispatch(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::tests::{boom_fault, FixedEnvironment};
	use crate::scheduler::tests::{RecordingTimer, ScriptedTransport};
	use crate::scheduler::DiscardReason;
	use crashpost_core::{DeliveryError, FieldFilter};
	use std::sync::Mutex;
	use tracing_test::traced_test;

	#[derive(Default)]
	struct RecordingPrompt {
		accept: bool,
		presented: Mutex<Vec<Report>>,
	}

	impl PromptHandler for RecordingPrompt {
		fn present(&self, report: &Report) -> bool {
			self.presented.lock().unwrap().push(report.clone());
			self.accept
		}
	}

	struct Harness {
		reporter: Reporter,
		transport: Arc<ScriptedTransport>,
		timer: Arc<RecordingTimer>,
	}

	fn harness(
		config: ReporterConfig,
		environment: FixedEnvironment,
		prompt: Option<Arc<RecordingPrompt>>,
	) -> Harness {
		let transport = Arc::new(ScriptedTransport::always(Ok(())));
		let timer = Arc::new(RecordingTimer::default());
		let mut builder = Reporter::builder()
			.config(config)
			.environment(Arc::new(environment))
			.transport(Arc::clone(&transport) as Arc<dyn Transport>)
			.timer(Arc::clone(&timer) as Arc<dyn TimerFacility>);
		if let Some(prompt) = prompt {
			builder = builder.prompt_handler(prompt);
		}
		Harness {
			reporter: builder.build().unwrap(),
			transport,
			timer,
		}
	}

	fn config() -> ReporterConfig {
		ReporterConfig::new("https://collector.example.com/report")
	}

	#[derive(Debug)]
	struct SyncFailed;

	impl std::fmt::Display for SyncFailed {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			f.write_str("sync failed")
		}
	}

	impl StdError for SyncFailed {}

	#[test]
	fn build_without_timer_outside_runtime_fails() {
		let result = Reporter::builder().config(config()).build();
		assert!(matches!(result, Err(ReporterError::NoTimerFacility)));
	}

	#[test]
	#[traced_test]
	fn build_logs_retry_bounds() {
		let _harness = harness(config(), FixedEnvironment::below_threshold(), None);
		assert!(logs_contain("Reporter initialized"));
		assert!(logs_contain("max_attempts=18"));
		assert!(logs_contain("retry_window_secs=28670"));
	}

	#[tokio::test]
	async fn build_inside_runtime_uses_tokio_timer() {
		let reporter = Reporter::builder().config(config()).build();
		assert!(reporter.is_ok());
	}

	#[test]
	fn silent_dispatch_sends_message_and_thread() {
		let h = harness(config(), FixedEnvironment::below_threshold(), None);
		let report = h.reporter.capture(&boom_fault(), "main", None, false);

		let dispatch = h.reporter.dispatch(report).unwrap();
		assert_eq!(dispatch, Dispatch::Attempted(AttemptOutcome::Delivered));

		let sent = h.transport.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		let body = crate::transport::encode_form(&sent[0].0, &sent[0].2);
		assert!(body.contains("message=boom&threadName=main"));
	}

	#[test]
	fn connection_refused_schedules_first_retry() {
		let transport = Arc::new(ScriptedTransport::always(Err(DeliveryError::Io(
			"connection refused".into(),
		))));
		let timer = Arc::new(RecordingTimer::default());
		let reporter = Reporter::builder()
			.config(config())
			.environment(Arc::new(FixedEnvironment::below_threshold()))
			.transport(Arc::clone(&transport) as Arc<dyn Transport>)
			.timer(Arc::clone(&timer) as Arc<dyn TimerFacility>)
			.build()
			.unwrap();

		let report = reporter.capture(&boom_fault(), "main", None, false);
		let outcome = reporter.submit(report).unwrap();
		assert_eq!(
			outcome,
			AttemptOutcome::RetryScheduled {
				retry_count: 1,
				delay: std::time::Duration::from_millis(2000),
			}
		);
		assert_eq!(timer.count(), 1);
	}

	#[test]
	fn automatic_report_on_newer_platform_is_suppressed() {
		let h = harness(config(), FixedEnvironment::newer_platform(), None);
		let report = h.reporter.capture(&boom_fault(), "main", None, false);

		assert_eq!(
			h.reporter.dispatch(report).unwrap(),
			Dispatch::Attempted(AttemptOutcome::Discarded(DiscardReason::Suppressed))
		);
		assert_eq!(h.transport.calls(), 0);
		assert_eq!(h.timer.count(), 0);
	}

	#[test]
	fn prompt_handler_receives_automatic_reports() {
		let prompt = Arc::new(RecordingPrompt {
			accept: true,
			..Default::default()
		});
		let h = harness(
			config(),
			FixedEnvironment::below_threshold(),
			Some(Arc::clone(&prompt)),
		);
		let report = h.reporter.capture(&boom_fault(), "main", None, false);

		assert_eq!(h.reporter.dispatch(report).unwrap(), Dispatch::Prompted);
		assert_eq!(prompt.presented.lock().unwrap().len(), 1);
		assert_eq!(h.transport.calls(), 0);
	}

	#[test]
	fn declined_prompt_falls_back_to_silent_delivery() {
		let prompt = Arc::new(RecordingPrompt::default());
		let h = harness(
			config(),
			FixedEnvironment::below_threshold(),
			Some(Arc::clone(&prompt)),
		);
		let report = h.reporter.capture(&boom_fault(), "main", None, false);

		assert_eq!(
			h.reporter.dispatch(report).unwrap(),
			Dispatch::Attempted(AttemptOutcome::Delivered)
		);
		assert_eq!(h.transport.calls(), 1);
	}

	#[test]
	fn deliver_marks_manual_and_attaches_message() {
		let prompt = Arc::new(RecordingPrompt {
			accept: true,
			..Default::default()
		});
		let h = harness(
			config(),
			FixedEnvironment::newer_platform(),
			Some(Arc::clone(&prompt)),
		);
		let report = h.reporter.capture(&boom_fault(), "main", None, false);
		assert_eq!(h.reporter.dispatch(report).unwrap(), Dispatch::Prompted);

		let presented = prompt.presented.lock().unwrap().remove(0);
		let outcome = h
			.reporter
			.deliver(presented, Some("it crashed while saving".to_string()))
			.unwrap();
		assert_eq!(outcome, AttemptOutcome::Delivered);

		let sent = h.transport.sent.lock().unwrap();
		assert!(sent[0].0.manual);
		assert_eq!(
			sent[0].0.extra_message.as_deref(),
			Some("it crashed while saving")
		);
	}

	#[test]
	fn manual_reports_skip_the_prompt() {
		let prompt = Arc::new(RecordingPrompt {
			accept: true,
			..Default::default()
		});
		let h = harness(
			config(),
			FixedEnvironment::below_threshold(),
			Some(Arc::clone(&prompt)),
		);
		let report = h.reporter.capture(&boom_fault(), "main", None, true);
		assert_eq!(
			h.reporter.dispatch(report).unwrap(),
			Dispatch::Attempted(AttemptOutcome::Delivered)
		);
		assert!(prompt.presented.lock().unwrap().is_empty());
	}

	#[test]
	fn report_error_builds_from_error_on_current_thread() {
		let h = harness(config(), FixedEnvironment::below_threshold(), None);
		let dispatch = h
			.reporter
			.report_error(&SyncFailed, Some("during resume".to_string()))
			.unwrap();
		assert_eq!(dispatch, Dispatch::Attempted(AttemptOutcome::Delivered));

		let sent = h.transport.sent.lock().unwrap();
		let report = &sent[0].0;
		assert!(!report.manual);
		assert_eq!(report.message.as_deref(), Some("sync failed"));
		assert!(report
			.exception_class
			.as_deref()
			.unwrap()
			.ends_with("SyncFailed"));
		assert_eq!(report.extra_message.as_deref(), Some("during resume"));
		assert_eq!(report.thread_name, current_thread_name());
	}

	#[test]
	fn include_fields_reach_the_transport() {
		let config = ReporterConfig {
			include_fields: FieldFilter::parse("exStackTrace,exMessage"),
			..config()
		};
		let h = harness(config, FixedEnvironment::below_threshold(), None);
		let report = h.reporter.capture(&boom_fault(), "main", None, false);
		h.reporter.dispatch(report).unwrap();

		let sent = h.transport.sent.lock().unwrap();
		let body = crate::transport::encode_form(&sent[0].0, &sent[0].2);
		assert!(body.starts_with("stackTrace="));
		assert!(body.ends_with("&message=boom"));
	}

	#[test]
	fn all_fields_round_trip_into_the_body() {
		let h = harness(config(), FixedEnvironment::below_threshold(), None);
		let report = h.reporter.capture(
			&boom_fault(),
			"main",
			Some("pressed back".to_string()),
			false,
		);
		h.reporter.dispatch(report.clone()).unwrap();

		let sent = h.transport.sent.lock().unwrap();
		let body = crate::transport::encode_form(&sent[0].0, &FieldFilter::All);
		let decoded: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
			.into_owned()
			.collect();

		let expected: Vec<(String, String)> = report
			.fields()
			.into_iter()
			.map(|(field, value)| (field.wire_name().to_string(), value))
			.collect();
		assert_eq!(decoded, expected);
		assert_eq!(decoded.len(), 14);
	}
}
