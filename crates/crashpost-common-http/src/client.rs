// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared blocking HTTP client with consistent User-Agent header.

use reqwest::blocking::{Client, ClientBuilder};

/// Creates a blocking HTTP client builder with the standard crashpost User-Agent header.
///
/// Blocking clients own a private runtime thread; build and drop them on a
/// plain thread, never inside an async task.
///
/// # Example
/// ```ignore
/// let client = crashpost_common_http::blocking_builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn blocking_builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the standard crashpost User-Agent string.
///
/// Format: `crashpost/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"crashpost/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}
