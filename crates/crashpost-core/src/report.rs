// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The immutable fault report and its wire field names.

use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Timestamp layout used for `exceptionTime`. Always carries the UTC offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Name std prints for threads spawned without a name.
pub const UNNAMED_THREAD: &str = "<unnamed>";

/// Formats a timestamp the way it is sent to the collector.
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
	Tz: TimeZone,
	Tz::Offset: fmt::Display,
{
	at.format(TIMESTAMP_FORMAT).to_string()
}

/// A single field of the submitted form.
///
/// Declaration order is emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReportField {
	StackTrace,
	ExceptionClass,
	ExceptionTime,
	Message,
	ThreadName,
	ExtraMessage,
	AvailableMemory,
	TotalMemory,
	VersionCode,
	VersionName,
	PackageName,
	Model,
	PlatformRevision,
	ReleaseVersion,
}

impl ReportField {
	pub const ALL: [ReportField; 14] = [
		Self::StackTrace,
		Self::ExceptionClass,
		Self::ExceptionTime,
		Self::Message,
		Self::ThreadName,
		Self::ExtraMessage,
		Self::AvailableMemory,
		Self::TotalMemory,
		Self::VersionCode,
		Self::VersionName,
		Self::PackageName,
		Self::Model,
		Self::PlatformRevision,
		Self::ReleaseVersion,
	];

	/// Form key sent to the collector.
	pub fn wire_name(self) -> &'static str {
		match self {
			Self::StackTrace => "stackTrace",
			Self::ExceptionClass => "exceptionClass",
			Self::ExceptionTime => "exceptionTime",
			Self::Message => "message",
			Self::ThreadName => "threadName",
			Self::ExtraMessage => "extraMessage",
			Self::AvailableMemory => "availableMemory",
			Self::TotalMemory => "totalMemory",
			Self::VersionCode => "versionCode",
			Self::VersionName => "versionName",
			Self::PackageName => "packageName",
			Self::Model => "model",
			Self::PlatformRevision => "platformRevision",
			Self::ReleaseVersion => "releaseVersion",
		}
	}

	/// Older name accepted in `include_fields` allow-lists.
	pub fn legacy_name(self) -> &'static str {
		match self {
			Self::StackTrace => "exStackTrace",
			Self::ExceptionClass => "exClass",
			Self::ExceptionTime => "exDateTime",
			Self::Message => "exMessage",
			Self::ThreadName => "exThreadName",
			Self::ExtraMessage => "extraMessage",
			Self::AvailableMemory => "devAvailableMemory",
			Self::TotalMemory => "devTotalMemory",
			Self::VersionCode => "appVersionCode",
			Self::VersionName => "appVersionName",
			Self::PackageName => "appPackageName",
			Self::Model => "devModel",
			Self::PlatformRevision => "devSdk",
			Self::ReleaseVersion => "devReleaseVersion",
		}
	}

	/// Resolves either the wire name or the legacy name.
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|f| f.wire_name() == name || f.legacy_name() == name)
	}
}

impl fmt::Display for ReportField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.wire_name())
	}
}

/// Structured description of one fault occurrence plus environment context.
///
/// A report is built once at capture time and resent verbatim on every retry.
/// The only ways to derive a different report are [`Report::with_extra_message`]
/// and [`Report::into_manual`], which the interactive path uses before a
/// delivery task exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
	/// Full formatted trace, not only the top frame.
	pub stack_trace: String,
	pub exception_class: Option<String>,
	pub message: Option<String>,
	pub thread_name: String,
	/// Formatted with [`TIMESTAMP_FORMAT`].
	pub timestamp: Option<String>,
	/// User-supplied text from the interactive path.
	pub extra_message: Option<String>,
	pub available_memory_bytes: Option<u64>,
	pub total_memory_bytes: Option<u64>,
	/// True when the user explicitly asked for the report to be sent.
	pub manual: bool,
	pub model: Option<String>,
	pub release_version: Option<String>,
	pub platform_revision: Option<String>,
	pub version_code: Option<u64>,
	pub version_name: Option<String>,
	pub package_name: Option<String>,
}

impl Report {
	/// Returns a copy carrying the given user message verbatim. An empty
	/// message is treated as absent.
	pub fn with_extra_message(self, extra_message: Option<String>) -> Self {
		Self {
			extra_message: extra_message.filter(|m| !m.is_empty()),
			..self
		}
	}

	/// Returns a copy marked as explicitly requested by the user.
	pub fn into_manual(self) -> Self {
		Self {
			manual: true,
			..self
		}
	}

	/// Value of a single field, `None` when the field is absent.
	pub fn value(&self, field: ReportField) -> Option<String> {
		match field {
			ReportField::StackTrace => Some(self.stack_trace.clone()),
			ReportField::ExceptionClass => self.exception_class.clone(),
			ReportField::ExceptionTime => self.timestamp.clone(),
			ReportField::Message => self.message.clone(),
			ReportField::ThreadName => Some(self.thread_name.clone()),
			ReportField::ExtraMessage => self.extra_message.clone(),
			ReportField::AvailableMemory => self.available_memory_bytes.map(|b| b.to_string()),
			ReportField::TotalMemory => self.total_memory_bytes.map(|b| b.to_string()),
			ReportField::VersionCode => self.version_code.map(|c| c.to_string()),
			ReportField::VersionName => self.version_name.clone(),
			ReportField::PackageName => self.package_name.clone(),
			ReportField::Model => self.model.clone(),
			ReportField::PlatformRevision => self.platform_revision.clone(),
			ReportField::ReleaseVersion => self.release_version.clone(),
		}
	}

	/// All present fields in emission order.
	pub fn fields(&self) -> Vec<(ReportField, String)> {
		ReportField::ALL
			.into_iter()
			.filter_map(|field| self.value(field).map(|value| (field, value)))
			.collect()
	}
}
