// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exponential retry delay and the retry bound.

use std::time::Duration;

/// Largest exponent applied to the retry delay (`2^12` s, about 68 minutes).
pub const DEFAULT_MAXIMUM_BACKOFF_EXPONENT: u32 = 12;

/// Retries before a report is discarded. Keeps retrying at the capped delay
/// for several hours after the exponent stops growing.
pub const DEFAULT_MAXIMUM_RETRY_COUNT: u32 = DEFAULT_MAXIMUM_BACKOFF_EXPONENT + 5;

const BASE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
	pub max_retry_count: u32,
	pub max_backoff_exponent: u32,
}

impl Default for Backoff {
	fn default() -> Self {
		Self {
			max_retry_count: DEFAULT_MAXIMUM_RETRY_COUNT,
			max_backoff_exponent: DEFAULT_MAXIMUM_BACKOFF_EXPONENT,
		}
	}
}

impl Backoff {
	/// Delay before the attempt numbered `retry_count`: `2^min(retry_count, max) * 1000` ms.
	pub fn delay_for(&self, retry_count: u32) -> Duration {
		let exponent = retry_count.min(self.max_backoff_exponent);
		let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
		Duration::from_millis(factor.saturating_mul(BASE_DELAY_MS))
	}

	/// Whether a task that has already been retried `retry_count` times must be discarded.
	pub fn is_exhausted(&self, retry_count: u32) -> bool {
		retry_count >= self.max_retry_count
	}

	/// Initial attempt plus every retry.
	pub fn total_attempts(&self) -> u32 {
		self.max_retry_count.saturating_add(1)
	}

	/// Sum of every delay a task waits through before it is discarded.
	pub fn total_delay(&self) -> Duration {
		(1..=self.max_retry_count).map(|r| self.delay_for(r)).sum()
	}
}
