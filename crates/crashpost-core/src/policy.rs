// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Routing decisions for freshly captured reports.

use crate::report::Report;

/// First platform revision on which automatic reports are suppressed by default.
pub const DEFAULT_NEW_PLATFORM_THRESHOLD: u32 = 8;

/// Whether a report may be delivered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
	SendNow,
	Suppress,
}

/// Which path a report takes once it is allowed to leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
	/// Hand the report to the UI collaborator for confirmation.
	Prompt,
	/// Deliver without asking.
	Deliver,
}

/// Suppression policy for automatic reports on newer platform revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
	/// Permit silent automatic reports on platforms at or above the threshold.
	pub report_on_new_platforms: bool,
	pub new_platform_threshold: u32,
}

impl Default for RoutingPolicy {
	fn default() -> Self {
		Self {
			report_on_new_platforms: false,
			new_platform_threshold: DEFAULT_NEW_PLATFORM_THRESHOLD,
		}
	}
}

impl RoutingPolicy {
	/// The suppression rule.
	///
	/// Suppress only when the report is automatic, the platform is at or
	/// above the threshold, and silent reporting there is not allowed.
	pub fn decide(
		manual: bool,
		platform_is_newer_than_threshold: bool,
		silent_reporting_allowed_on_new_platforms: bool,
	) -> RouteDecision {
		if !manual && platform_is_newer_than_threshold && !silent_reporting_allowed_on_new_platforms {
			RouteDecision::Suppress
		} else {
			RouteDecision::SendNow
		}
	}

	/// Compares a platform revision against the threshold.
	///
	/// A missing or non-numeric revision means a development build and counts
	/// as newer.
	pub fn is_newer_platform(&self, revision: Option<&str>) -> bool {
		match revision.and_then(|r| r.trim().parse::<u32>().ok()) {
			Some(revision) => revision >= self.new_platform_threshold,
			None => true,
		}
	}

	/// Applies [`RoutingPolicy::decide`] to a built report.
	pub fn check(&self, report: &Report) -> RouteDecision {
		Self::decide(
			report.manual,
			self.is_newer_platform(report.platform_revision.as_deref()),
			self.report_on_new_platforms,
		)
	}

	/// Prompt when a UI can present the report and the user has not already
	/// asked for it to be sent.
	pub fn route(manual: bool, prompt_available: bool) -> Route {
		if prompt_available && !manual {
			Route::Prompt
		} else {
			Route::Deliver
		}
	}
}
