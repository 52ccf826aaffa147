// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the crashpost SDK.

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, ReporterError>;

/// Errors surfaced by the [`crate::Reporter`] facade.
///
/// Delivery failures are not errors at this level: they end in an
/// [`crate::AttemptOutcome`] and are logged by the scheduler.
#[derive(Debug, Error)]
pub enum ReporterError {
	/// Configuration could not be loaded or failed validation.
	#[error("configuration error: {0}")]
	Config(#[from] crashpost_config::ConfigError),

	/// No timer facility was supplied and no tokio runtime is running.
	#[error("no timer facility: supply one or build the reporter inside a tokio runtime")]
	NoTimerFacility,

	/// The delivery thread could not be spawned.
	#[error("failed to spawn delivery thread: {0}")]
	DeliveryThread(#[from] std::io::Error),

	/// The delivery thread panicked before finishing its attempt.
	#[error("delivery thread panicked: {0}")]
	DeliveryPanicked(String),
}
