// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reporter configuration: the partial layer read from each source and the
//! resolved value handed to the SDK.

use std::time::Duration;

use crashpost_core::{
	Backoff, DeliveryError, FieldFilter, PromptText, RoutingPolicy, ALL_FIELDS_TOKEN,
	DEFAULT_MAXIMUM_BACKOFF_EXPONENT, DEFAULT_MAXIMUM_RETRY_COUNT, DEFAULT_NEW_PLATFORM_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest accepted backoff exponent (`2^30` seconds is already decades).
pub const MAX_BACKOFF_EXPONENT_LIMIT: u32 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptConfigLayer {
	pub title: Option<String>,
	pub text: Option<String>,
	pub message_hint: Option<String>,
}

impl PromptConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.title.is_some() {
			self.title = other.title;
		}
		if other.text.is_some() {
			self.text = other.text;
		}
		if other.message_hint.is_some() {
			self.message_hint = other.message_hint;
		}
	}

	pub fn finalize(self) -> PromptText {
		let defaults = PromptText::default();
		PromptText {
			title: self.title.unwrap_or(defaults.title),
			text: self.text.unwrap_or(defaults.text),
			message_hint: self.message_hint,
		}
	}
}

/// One source's view of the configuration. Every field is optional so that
/// higher-precedence sources only override what they set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReporterConfigLayer {
	pub target_url: Option<String>,
	pub maximum_retry_count: Option<u32>,
	pub maximum_backoff_exponent: Option<u32>,
	pub report_on_new_platforms: Option<bool>,
	pub include_fields: Option<String>,
	pub new_platform_threshold: Option<u32>,
	pub request_timeout_secs: Option<u64>,
	pub prompt: Option<PromptConfigLayer>,
}

impl ReporterConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.target_url.is_some() {
			self.target_url = other.target_url;
		}
		if other.maximum_retry_count.is_some() {
			self.maximum_retry_count = other.maximum_retry_count;
		}
		if other.maximum_backoff_exponent.is_some() {
			self.maximum_backoff_exponent = other.maximum_backoff_exponent;
		}
		if other.report_on_new_platforms.is_some() {
			self.report_on_new_platforms = other.report_on_new_platforms;
		}
		if other.include_fields.is_some() {
			self.include_fields = other.include_fields;
		}
		if other.new_platform_threshold.is_some() {
			self.new_platform_threshold = other.new_platform_threshold;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if let Some(theirs) = other.prompt {
			self
				.prompt
				.get_or_insert_with(PromptConfigLayer::default)
				.merge(theirs);
		}
	}

	/// Resolves defaults and validates values.
	///
	/// A missing target URL is not an error here; it is reported by
	/// [`ReporterConfig::require_target_url`] when a delivery is attempted.
	pub fn finalize(self) -> Result<ReporterConfig, ConfigError> {
		let target_url = match self.target_url.map(|u| u.trim().to_string()) {
			Some(url) if url.is_empty() => None,
			Some(url) => Some(validate_target_url(url)?),
			None => None,
		};

		let max_backoff_exponent = self
			.maximum_backoff_exponent
			.unwrap_or(DEFAULT_MAXIMUM_BACKOFF_EXPONENT);
		if max_backoff_exponent > MAX_BACKOFF_EXPONENT_LIMIT {
			return Err(ConfigError::InvalidValue {
				key: "maximum_backoff_exponent".to_string(),
				message: format!(
					"{max_backoff_exponent} exceeds the limit of {MAX_BACKOFF_EXPONENT_LIMIT}"
				),
			});
		}

		let include_fields = self
			.include_fields
			.unwrap_or_else(|| ALL_FIELDS_TOKEN.to_string());
		let unknown = FieldFilter::unknown_names(&include_fields);
		if !unknown.is_empty() {
			warn!(unknown = ?unknown, "include_fields names unknown report fields; ignoring them");
		}

		Ok(ReporterConfig {
			target_url,
			backoff: Backoff {
				max_retry_count: self
					.maximum_retry_count
					.unwrap_or(DEFAULT_MAXIMUM_RETRY_COUNT),
				max_backoff_exponent,
			},
			report_on_new_platforms: self.report_on_new_platforms.unwrap_or(false),
			include_fields: FieldFilter::parse(&include_fields),
			new_platform_threshold: self
				.new_platform_threshold
				.unwrap_or(DEFAULT_NEW_PLATFORM_THRESHOLD),
			request_timeout: Duration::from_secs(
				self
					.request_timeout_secs
					.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
			),
			prompt: self.prompt.unwrap_or_default().finalize(),
		})
	}
}

fn validate_target_url(raw: String) -> Result<String, ConfigError> {
	let parsed = url::Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
		key: "target_url".to_string(),
		message: format!("'{raw}' is not a valid URL: {e}"),
	})?;
	match parsed.scheme() {
		"http" | "https" => Ok(raw),
		other => Err(ConfigError::InvalidValue {
			key: "target_url".to_string(),
			message: format!("unsupported scheme '{other}', expected http or https"),
		}),
	}
}

/// Fully resolved reporter configuration. Read-only for the lifetime of a
/// delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterConfig {
	pub target_url: Option<String>,
	pub backoff: Backoff,
	pub report_on_new_platforms: bool,
	pub include_fields: FieldFilter,
	pub new_platform_threshold: u32,
	pub request_timeout: Duration,
	pub prompt: PromptText,
}

impl Default for ReporterConfig {
	fn default() -> Self {
		Self {
			target_url: None,
			backoff: Backoff::default(),
			report_on_new_platforms: false,
			include_fields: FieldFilter::All,
			new_platform_threshold: DEFAULT_NEW_PLATFORM_THRESHOLD,
			request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
			prompt: PromptText::default(),
		}
	}
}

impl ReporterConfig {
	/// Defaults with the given collector URL.
	pub fn new(target_url: impl Into<String>) -> Self {
		Self {
			target_url: Some(target_url.into()),
			..Default::default()
		}
	}

	pub fn routing_policy(&self) -> RoutingPolicy {
		RoutingPolicy {
			report_on_new_platforms: self.report_on_new_platforms,
			new_platform_threshold: self.new_platform_threshold,
		}
	}

	/// The collector URL, or the fatal configuration error raised at first use.
	pub fn require_target_url(&self) -> Result<&str, DeliveryError> {
		self
			.target_url
			.as_deref()
			.ok_or(DeliveryError::MissingTargetUrl)
	}
}
