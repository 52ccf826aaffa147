// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fault capture and delivery SDK for Rust applications.
//!
//! This crate provides:
//! - A chained, process-wide panic hook ([`FaultInterceptor`])
//! - Report construction from panics and errors plus environment probes
//! - Routing between an interactive prompt and silent delivery
//! - A retry/backoff scheduler that never blocks on waits
//! - A blocking HTTP form transport
//!
//! # Example
//!
//! ```ignore
//! use crashpost::Reporter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reporter = Reporter::builder()
//!         .app_info(crashpost::app_info!())
//!         .build()?;
//!     reporter.install_panic_hook();
//!
//!     // ... application code ...
//!     Ok(())
//! }
//! ```

mod backtrace;
mod builder;
mod delivery;
mod environment;
mod error;
mod fault;
mod interceptor;
mod prompt;
mod reporter;
mod scheduler;
mod timer;
mod transport;

pub use backtrace::render_backtrace;
pub use builder::{current_thread_name, ReportBuilder};
pub use delivery::DELIVERY_THREAD_NAME;
pub use environment::{AppInfo, EnvironmentInfoProvider, HostEnvironment};
pub use error::{ReporterError, Result};
pub use fault::{panic_payload, Fault, OPAQUE_PAYLOAD};
pub use interceptor::FaultInterceptor;
pub use prompt::PromptHandler;
pub use reporter::{Dispatch, Reporter, ReporterBuilder};
pub use scheduler::{AttemptOutcome, DeliveryScheduler, DiscardReason};
pub use timer::{Redeliver, TimerFacility, TokioTimer};
pub use transport::{encode_form, HttpTransport, Transport, FORM_CONTENT_TYPE};

// Re-export core types for convenience
pub use crashpost_config::{load_config, load_config_with_file, ReporterConfig};
pub use crashpost_core::{
	Backoff, DeliveryError, DeliveryTask, FieldFilter, PromptText, Report, ReportField,
	RouteDecision, RoutingPolicy, TaskId,
};
