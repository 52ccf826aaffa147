// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery task: a report plus its retry progress.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::Report;

/// Unique identifier for a delivery task.
///
/// UUIDv7: time-ordered and unique per fault, so a timer facility keyed by
/// this id never conflates two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for TaskId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TaskId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Scheduling record for one fault occurrence.
///
/// The wrapped report is only reachable by shared reference; the retry
/// counter is the single piece of state that changes between attempts, and it
/// only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTask {
	id: TaskId,
	report: Report,
	retry_count: u32,
}

impl DeliveryTask {
	pub fn new(report: Report) -> Self {
		Self {
			id: TaskId::new(),
			report,
			retry_count: 0,
		}
	}

	/// Rebuilds a task handed back by an external timer facility.
	pub fn resume(id: TaskId, report: Report, retry_count: u32) -> Self {
		Self {
			id,
			report,
			retry_count,
		}
	}

	pub fn id(&self) -> TaskId {
		self.id
	}

	pub fn report(&self) -> &Report {
		&self.report
	}

	pub fn retry_count(&self) -> u32 {
		self.retry_count
	}

	pub fn is_first_attempt(&self) -> bool {
		self.retry_count == 0
	}

	/// Records a failed transient attempt and returns the new retry count.
	pub fn advance_retry(&mut self) -> u32 {
		self.retry_count = self.retry_count.saturating_add(1);
		self.retry_count
	}
}
