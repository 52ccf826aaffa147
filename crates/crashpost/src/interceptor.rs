// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook integration for automatic fault reporting.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, OnceLock, RwLock};

use tracing::{debug, error, info};

use crate::builder::current_thread_name;
use crate::delivery::{in_delivery, run_on_delivery_thread};
use crate::error::Result;
use crate::fault::{panic_payload, Fault};
use crate::reporter::{Dispatch, Reporter};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

static INTERCEPTOR: OnceLock<Arc<FaultInterceptor>> = OnceLock::new();

/// The process-wide panic hook.
///
/// Installed at most once per process. The hook that was active before the
/// first install is kept and always runs after reporting, so default panic
/// output and any other hook keep working.
pub struct FaultInterceptor {
	reporter: RwLock<Reporter>,
	previous: PanicHook,
}

impl FaultInterceptor {
	/// Install the interceptor, or point the installed one at `reporter`.
	///
	/// Only the first call chains the previous hook. Later calls swap the
	/// reporter and return the same interceptor.
	pub fn install(reporter: Reporter) -> Arc<Self> {
		let mut created = false;
		// Concurrent callers block until the hook below is in place.
		let interceptor = INTERCEPTOR.get_or_init(|| {
			created = true;
			let interceptor = Arc::new(Self {
				reporter: RwLock::new(reporter.clone()),
				previous: panic::take_hook(),
			});
			let hooked = Arc::clone(&interceptor);
			panic::set_hook(Box::new(move |info| hooked.on_panic(info)));
			info!("Panic hook installed");
			interceptor
		});

		if !created {
			*interceptor
				.reporter
				.write()
				.unwrap_or_else(|e| e.into_inner()) = reporter;
			debug!("Panic hook already installed, reporter replaced");
		}

		Arc::clone(interceptor)
	}

	/// The installed interceptor, if any.
	pub fn installed() -> Option<Arc<Self>> {
		INTERCEPTOR.get().cloned()
	}

	/// The reporter panics are currently routed to.
	pub fn reporter(&self) -> Reporter {
		self.reporter
			.read()
			.unwrap_or_else(|e| e.into_inner())
			.clone()
	}

	/// Report a recoverable error through the active reporter.
	pub fn report_error<E>(&self, error: &E, extra_message: Option<String>) -> Result<Dispatch>
	where
		E: StdError + 'static,
	{
		self.reporter().report_error(error, extra_message)
	}

	fn on_panic(&self, info: &PanicHookInfo<'_>) {
		if in_delivery() {
			debug!("panic on a delivery thread, not reporting it");
		} else {
			self.report_panic(info);
		}

		(self.previous)(info);
	}

	/// Only the cheap parts run here; building and routing happen on a
	/// delivery thread so a failure there cannot abort the process.
	fn report_panic(&self, info: &PanicHookInfo<'_>) {
		let backtrace = Backtrace::force_capture();
		let (class, message) = panic_payload(info.payload());
		let location = info
			.location()
			.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
		let thread_name = current_thread_name();
		let reporter = self.reporter();

		let result = run_on_delivery_thread(move || {
			let fault = Fault::from_panic(class, Some(message), location.as_deref(), &backtrace);
			let report = reporter.capture(&fault, &thread_name, None, false);
			reporter.dispatch_in_place(report)
		});

		match result {
			Ok(dispatch) => debug!(?dispatch, "panic reported"),
			Err(e) => {
				error!(error = %e, "Failed to report panic");
				eprintln!("Failed to report panic: {e}");
			}
		}
	}
}

