// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy at the transport boundary.

use thiserror::Error;

/// Errors a single delivery attempt can end with.
///
/// Only [`DeliveryError::Io`] is transient. Everything else describes a
/// persistent problem with the environment, the endpoint or the configuration,
/// so the task is discarded instead of rescheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
	/// The process is not allowed to open outbound network connections.
	#[error("network permission denied: {0}")]
	PermissionDenied(String),

	/// Malformed request or unexpected response from the collector.
	#[error("protocol failure: {0}")]
	Protocol(String),

	/// TLS negotiation with the collector failed.
	#[error("TLS negotiation failed: {0}")]
	Tls(String),

	/// Connection refused, timeout, DNS failure, reset or a retryable status.
	#[error("I/O failure: {0}")]
	Io(String),

	/// No collector URL is configured.
	#[error("collector target URL is not configured")]
	MissingTargetUrl,
}

impl DeliveryError {
	/// Whether a later attempt could succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Io(_) => true,
			Self::PermissionDenied(_) | Self::Protocol(_) | Self::Tls(_) | Self::MissingTargetUrl => {
				false
			}
		}
	}

	/// Short, stable name used as a structured log field.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::PermissionDenied(_) => "permission_denied",
			Self::Protocol(_) => "protocol",
			Self::Tls(_) => "tls",
			Self::Io(_) => "io",
			Self::MissingTargetUrl => "missing_target_url",
		}
	}
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;
