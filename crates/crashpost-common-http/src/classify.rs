// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Maps transport failures onto [`DeliveryError`].

use std::error::Error as StdError;
use std::io;

use crashpost_core::DeliveryError;
use reqwest::{StatusCode, Url};
use tracing::trace;

/// Status codes that indicate a transient collector-side problem.
pub const RETRYABLE_STATUSES: &[StatusCode] = &[
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

const TLS_MARKERS: &[&str] = &["tls", "certificate", "handshake", "ssl"];

/// Socket-level failures that never come from TLS negotiation.
const CONNECTION_KINDS: &[io::ErrorKind] = &[
	io::ErrorKind::ConnectionRefused,
	io::ErrorKind::ConnectionReset,
	io::ErrorKind::ConnectionAborted,
	io::ErrorKind::NotConnected,
	io::ErrorKind::AddrInUse,
	io::ErrorKind::AddrNotAvailable,
	io::ErrorKind::TimedOut,
];

/// Classify a failed request.
///
/// Builder, redirect and decode failures are protocol errors. Everything else
/// is inspected through its source chain, ignoring the request URL.
pub fn classify_error(err: &reqwest::Error) -> DeliveryError {
	if err.is_builder() || err.is_redirect() || err.is_decode() {
		return DeliveryError::Protocol(render_chain(err));
	}
	if let Some(status) = err.status() {
		if let Some(classified) = classify_status(status, "") {
			return classified;
		}
	}
	classify_chain(err, err.url())
}

/// Classify an arbitrary error by walking its source chain.
///
/// A `PermissionDenied` I/O error anywhere in the chain is fatal. Connection
/// level I/O failures are transient. TLS negotiation failures are detected by
/// the messages of the underlying causes. The rest is treated as a transient
/// I/O failure.
pub fn classify_source_chain(err: &(dyn StdError + 'static)) -> DeliveryError {
	classify_chain(err, None)
}

fn classify_chain(err: &(dyn StdError + 'static), target: Option<&Url>) -> DeliveryError {
	let rendered = render_chain(err);

	if chain_has_io_kind(err, |kind| kind == io::ErrorKind::PermissionDenied) {
		trace!(error = %rendered, "permission denied in error chain");
		return DeliveryError::PermissionDenied(rendered);
	}

	if chain_has_io_kind(err, |kind| CONNECTION_KINDS.contains(&kind)) {
		return DeliveryError::Io(rendered);
	}

	if mentions_tls(&cause_text(err, target)) {
		return DeliveryError::Tls(rendered);
	}

	DeliveryError::Io(rendered)
}

/// Classify a response status. Returns `None` for success.
pub fn classify_status(status: StatusCode, body: &str) -> Option<DeliveryError> {
	if status.is_success() {
		return None;
	}

	let detail = if body.trim().is_empty() {
		format!("collector responded with {status}")
	} else {
		format!("collector responded with {status}: {}", body.trim())
	};

	if RETRYABLE_STATUSES.contains(&status) || status.is_server_error() {
		Some(DeliveryError::Io(detail))
	} else {
		Some(DeliveryError::Protocol(detail))
	}
}

fn chain_has_io_kind(
	err: &(dyn StdError + 'static),
	matches: impl Fn(io::ErrorKind) -> bool,
) -> bool {
	let mut current = Some(err);
	while let Some(e) = current {
		if e.downcast_ref::<io::Error>().is_some_and(|io_err| matches(io_err.kind())) {
			return true;
		}
		current = e.source();
	}
	false
}

fn render_chain(err: &(dyn StdError + 'static)) -> String {
	let mut rendered = err.to_string();
	let mut current = err.source();
	while let Some(e) = current {
		rendered.push_str(": ");
		rendered.push_str(&e.to_string());
		current = e.source();
	}
	rendered
}

/// Messages of the causes below `err`, or `err` itself when it has none, with
/// the target URL and host removed.
fn cause_text(err: &(dyn StdError + 'static), target: Option<&Url>) -> String {
	let mut text = match err.source() {
		Some(source) => render_chain(source),
		None => err.to_string(),
	};
	if let Some(url) = target {
		text = text.replace(url.as_str(), "");
		if let Some(host) = url.host_str() {
			text = text.replace(host, "");
		}
	}
	text
}

fn mentions_tls(rendered: &str) -> bool {
	let lower = rendered.to_ascii_lowercase();
	TLS_MARKERS.iter().any(|marker| lower.contains(marker))
}
