// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Report assembly from a fault plus environment probes.

use std::sync::Arc;

use crashpost_core::{format_timestamp, Report, UNNAMED_THREAD};

use crate::environment::EnvironmentInfoProvider;
use crate::fault::Fault;

/// Builds [`Report`]s, probing the environment at call time.
#[derive(Clone)]
pub struct ReportBuilder {
	environment: Arc<dyn EnvironmentInfoProvider>,
}

impl ReportBuilder {
	pub fn new(environment: Arc<dyn EnvironmentInfoProvider>) -> Self {
		Self { environment }
	}

	pub fn build(
		&self,
		fault: &Fault,
		thread_name: &str,
		extra_message: Option<String>,
		manual: bool,
	) -> Report {
		let env = &self.environment;
		let app = env.app_info();

		Report {
			stack_trace: fault.trace.clone(),
			exception_class: Some(fault.class.clone()),
			message: fault.message.clone(),
			thread_name: thread_name.to_string(),
			timestamp: Some(format_timestamp(&env.now())),
			extra_message: None,
			available_memory_bytes: env.available_memory_bytes(),
			total_memory_bytes: env.total_memory_bytes(),
			manual,
			model: env.model(),
			release_version: env.release_version(),
			platform_revision: env.platform_revision(),
			version_code: app.version_code,
			version_name: app.version_name,
			package_name: app.package_name,
		}
		.with_extra_message(extra_message)
	}
}

/// Name of the calling thread as std prints it in panic messages.
pub fn current_thread_name() -> String {
	std::thread::current()
		.name()
		.unwrap_or(UNNAMED_THREAD)
		.to_string()
}
