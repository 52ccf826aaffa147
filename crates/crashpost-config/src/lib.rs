// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reporter configuration for crashpost.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Validation of the collector URL and retry parameters
//! - Consistent environment variable naming (`CRASHPOST_*`)
//!
//! # Usage
//!
//! ```ignore
//! use crashpost_config::load_config;
//!
//! let config = load_config()?;
//! println!("Reporting to {:?}", config.target_url);
//! ```

pub mod error;
pub mod reporter;
pub mod sources;

pub use error::ConfigError;
pub use reporter::{PromptConfigLayer, ReporterConfig, ReporterConfigLayer};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, ENV_PREFIX};

use tracing::{debug, info};

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`CRASHPOST_*`)
/// 2. Config file (`$XDG_CONFIG_HOME/crashpost/config.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ReporterConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource)];
	if let Some(user) = TomlSource::user() {
		sources.push(Box::new(user));
	}
	sources.push(Box::new(EnvSource::default()));
	load_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ReporterConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::default()),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ReporterConfig, ConfigError> {
	load_from_sources(vec![Box::new(EnvSource::default())])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ReporterConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ReporterConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	let config = merged.finalize()?;

	info!(
		target_url = ?config.target_url,
		maximum_retry_count = config.backoff.max_retry_count,
		maximum_backoff_exponent = config.backoff.max_backoff_exponent,
		report_on_new_platforms = config.report_on_new_platforms,
		include_fields = %config.include_fields,
		"Reporter configuration loaded"
	);

	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn env_overrides_file() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			"target_url = \"https://file.example.com\"\nmaximum_retry_count = 2"
		)
		.unwrap();

		let prefix = "CRASHPOST_TEST_LIB_OVERRIDE_";
		std::env::set_var(format!("{prefix}TARGET_URL"), "https://env.example.com");

		let config = load_from_sources(vec![
			Box::new(EnvSource::with_prefix(prefix)),
			Box::new(TomlSource::new(file.path())),
			Box::new(DefaultsSource),
		])
		.unwrap();

		std::env::remove_var(format!("{prefix}TARGET_URL"));

		assert_eq!(config.target_url.as_deref(), Some("https://env.example.com"));
		assert_eq!(config.backoff.max_retry_count, 2);
	}

	#[test]
	fn invalid_value_fails_load() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "target_url = \"mailto:ops@example.com\"").unwrap();
		let result = load_from_sources(vec![Box::new(TomlSource::new(file.path()))]);
		assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
	}
}
