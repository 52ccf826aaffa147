// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Network submission of a single report.

use std::time::Duration;

use crashpost_common_http::{blocking_builder, classify_error, classify_status};
use crashpost_core::{DeliveryError, FieldFilter, Report};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Content type of every submission.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Sends one report as one request. Implementations block until the collector
/// answers or the request fails.
pub trait Transport: Send + Sync {
	fn send(&self, report: &Report, target_url: &str, filter: &FieldFilter)
		-> Result<(), DeliveryError>;
}

/// Encode the filtered, present fields of `report` as a form body.
pub fn encode_form(report: &Report, filter: &FieldFilter) -> String {
	let mut serializer = url::form_urlencoded::Serializer::new(String::new());
	for (name, value) in filter.apply(report) {
		serializer.append_pair(name, &value);
	}
	serializer.finish()
}

/// Blocking HTTP POST transport.
///
/// A client is built per request so that nothing outlives the delivery
/// thread it runs on.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	timeout: Duration,
}

impl HttpTransport {
	pub fn new(timeout: Duration) -> Self {
		Self { timeout }
	}
}

impl Transport for HttpTransport {
	fn send(
		&self,
		report: &Report,
		target_url: &str,
		filter: &FieldFilter,
	) -> Result<(), DeliveryError> {
		let body = encode_form(report, filter);

		let client = blocking_builder()
			.timeout(self.timeout)
			.build()
			.map_err(|e| classify_error(&e))?;

		debug!(url = %target_url, bytes = body.len(), "posting report");

		let response = client
			.post(target_url)
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.body(body)
			.send()
			.map_err(|e| classify_error(&e))?;

		let status = response.status();
		if status.is_success() {
			debug!(status = status.as_u16(), "collector accepted report");
			return Ok(());
		}

		let text = response.text().unwrap_or_default();
		match classify_status(status, &text) {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}
