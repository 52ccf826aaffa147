// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment probes read when a report is built.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local};
use tracing::trace;

/// Application descriptors attached to every report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppInfo {
	pub version_code: Option<u64>,
	pub version_name: Option<String>,
	pub package_name: Option<String>,
}

impl AppInfo {
	/// Descriptors for a package and its semver version.
	///
	/// The version code is `major * 1_000_000 + minor * 1_000 + patch` when the
	/// version parses as `major.minor.patch` (pre-release suffixes ignored).
	pub fn new(package_name: impl Into<String>, version_name: impl Into<String>) -> Self {
		let version_name = version_name.into();
		Self {
			version_code: version_code(&version_name),
			version_name: Some(version_name),
			package_name: Some(package_name.into()),
		}
	}
}

fn version_code(version: &str) -> Option<u64> {
	let core = version.split(['-', '+']).next()?;
	let mut parts = core.split('.').map(|p| p.parse::<u64>().ok());
	let major = parts.next()??;
	let minor = parts.next()??;
	let patch = parts.next()??;
	if parts.next().is_some() || minor >= 1_000 || patch >= 1_000 {
		return None;
	}
	Some(major * 1_000_000 + minor * 1_000 + patch)
}

/// [`AppInfo`] for the crate this macro is expanded in.
#[macro_export]
macro_rules! app_info {
	() => {
		$crate::AppInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
	};
}

/// Source of environment data for reports. Every probe may fail; a failed
/// probe omits its field.
pub trait EnvironmentInfoProvider: Send + Sync {
	fn available_memory_bytes(&self) -> Option<u64>;
	fn total_memory_bytes(&self) -> Option<u64>;
	fn model(&self) -> Option<String>;
	fn release_version(&self) -> Option<String>;
	/// Numeric platform revision compared against the routing threshold.
	fn platform_revision(&self) -> Option<String>;
	fn app_info(&self) -> AppInfo;

	fn now(&self) -> DateTime<FixedOffset> {
		Local::now().fixed_offset()
	}
}

/// Probes the running Linux host through procfs and sysfs.
///
/// On other platforms the file probes fail and only the host name and the
/// supplied descriptors are reported.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
	root: PathBuf,
	app: AppInfo,
	platform_revision: Option<String>,
}

impl HostEnvironment {
	pub fn new(app: AppInfo) -> Self {
		Self {
			root: PathBuf::from("/"),
			app,
			platform_revision: None,
		}
	}

	/// Read procfs and sysfs below `root` instead of `/`.
	pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.root = root.into();
		self
	}

	/// The host's platform revision. Without one every platform counts as newer.
	pub fn with_platform_revision(mut self, revision: impl Into<String>) -> Self {
		self.platform_revision = Some(revision.into());
		self
	}

	fn read(&self, relative: &str) -> Option<String> {
		let path = self.root.join(relative);
		match std::fs::read_to_string(&path) {
			Ok(content) => Some(content.trim().to_string()).filter(|s| !s.is_empty()),
			Err(e) => {
				trace!(path = %path.display(), error = %e, "environment probe failed");
				None
			}
		}
	}

	fn meminfo(&self, key: &str) -> Option<u64> {
		self.read("proc/meminfo")
			.and_then(|content| parse_meminfo(&content, key))
	}
}

/// Value of `key` in `/proc/meminfo` format, converted from kB to bytes.
fn parse_meminfo(content: &str, key: &str) -> Option<u64> {
	content.lines().find_map(|line| {
		let (name, rest) = line.split_once(':')?;
		if name.trim() != key {
			return None;
		}
		let mut tokens = rest.split_whitespace();
		let value: u64 = tokens.next()?.parse().ok()?;
		match tokens.next() {
			Some("kB") => value.checked_mul(1024),
			None => Some(value),
			Some(_) => None,
		}
	})
}

impl EnvironmentInfoProvider for HostEnvironment {
	fn available_memory_bytes(&self) -> Option<u64> {
		self.meminfo("MemAvailable")
	}

	fn total_memory_bytes(&self) -> Option<u64> {
		self.meminfo("MemTotal")
	}

	fn model(&self) -> Option<String> {
		self.read("sys/devices/virtual/dmi/id/product_name").or_else(|| {
			trace!(root = %self.root.display(), "falling back to host name for model");
			hostname::get()
				.ok()
				.and_then(|name| name.into_string().ok())
		})
	}

	fn release_version(&self) -> Option<String> {
		self.read("proc/sys/kernel/osrelease")
	}

	fn platform_revision(&self) -> Option<String> {
		self.platform_revision.clone()
	}

	fn app_info(&self) -> AppInfo {
		self.app.clone()
	}
}
