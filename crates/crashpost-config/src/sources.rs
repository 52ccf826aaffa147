// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::reporter::{PromptConfigLayer, ReporterConfigLayer};

/// Prefix of every environment variable read by [`EnvSource::default`].
pub const ENV_PREFIX: &str = "CRASHPOST_";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ReporterConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ReporterConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ReporterConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `$XDG_CONFIG_HOME/crashpost/config.toml`, when a config dir is known.
	pub fn user() -> Option<Self> {
		dirs::config_dir().map(|dir| Self::new(dir.join("crashpost").join("config.toml")))
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ReporterConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ReporterConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ReporterConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `CRASHPOST_<FIELD>`, e.g. `CRASHPOST_TARGET_URL`,
/// `CRASHPOST_PROMPT_TITLE`.
pub struct EnvSource {
	prefix: String,
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::with_prefix(ENV_PREFIX)
	}
}

impl EnvSource {
	pub fn with_prefix(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	fn var(&self, field: &str) -> Option<String> {
		std::env::var(format!("{}{field}", self.prefix))
			.ok()
			.filter(|s| !s.is_empty())
	}

	fn bool(&self, field: &str) -> Result<Option<bool>, ConfigError> {
		match self.var(field) {
			Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(Some(true)),
			Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(Some(false)),
			Some(v) => Err(ConfigError::InvalidValue {
				key: format!("{}{field}", self.prefix),
				message: format!("invalid bool value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn u32(&self, field: &str) -> Result<Option<u32>, ConfigError> {
		match self.var(field) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: format!("{}{field}", self.prefix),
				message: format!("invalid u32 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn u64(&self, field: &str) -> Result<Option<u64>, ConfigError> {
		match self.var(field) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: format!("{}{field}", self.prefix),
				message: format!("invalid u64 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn prompt(&self) -> Option<PromptConfigLayer> {
		let layer = PromptConfigLayer {
			title: self.var("PROMPT_TITLE"),
			text: self.var("PROMPT_TEXT"),
			message_hint: self.var("PROMPT_MESSAGE_HINT"),
		};
		(layer != PromptConfigLayer::default()).then_some(layer)
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ReporterConfigLayer, ConfigError> {
		debug!(prefix = %self.prefix, "loading environment variables");
		Ok(ReporterConfigLayer {
			target_url: self.var("TARGET_URL"),
			maximum_retry_count: self.u32("MAXIMUM_RETRY_COUNT")?,
			maximum_backoff_exponent: self.u32("MAXIMUM_BACKOFF_EXPONENT")?,
			report_on_new_platforms: self.bool("REPORT_ON_NEW_PLATFORMS")?,
			include_fields: self.var("INCLUDE_FIELDS"),
			new_platform_threshold: self.u32("NEW_PLATFORM_THRESHOLD")?,
			request_timeout_secs: self.u64("REQUEST_TIMEOUT_SECS")?,
			prompt: self.prompt(),
		})
	}
}
