// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crashpost_core::Report;

/// The UI collaborator for the interactive path.
///
/// `present` receives an automatic report and returns `true` when it took
/// ownership of the decision (showed a prompt). Once the user confirms, the
/// UI calls [`crate::Reporter::deliver`]. Returning `false` makes the reporter
/// deliver the report silently instead.
///
/// The prompt copy is available from [`crate::Reporter::prompt_text`].
pub trait PromptHandler: Send + Sync {
	fn present(&self, report: &Report) -> bool;
}
