// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Copy shown by a UI collaborator when it asks the user to send a report.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the application label.
const LABEL_PLACEHOLDER: &str = "^1";

pub const DEFAULT_PROMPT_TITLE: &str = "^1 crashed";
pub const DEFAULT_PROMPT_TEXT: &str = "^1 crashed because of an unexpected error. Please help fixing the error by sending an error report to the developer.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptText {
	pub title: String,
	pub text: String,
	/// When set, the UI offers a free-text field with this hint.
	pub message_hint: Option<String>,
}

impl Default for PromptText {
	fn default() -> Self {
		Self {
			title: DEFAULT_PROMPT_TITLE.to_string(),
			text: DEFAULT_PROMPT_TEXT.to_string(),
			message_hint: None,
		}
	}
}

impl PromptText {
	pub fn title_for(&self, app_label: &str) -> String {
		self.title.replace(LABEL_PLACEHOLDER, app_label)
	}

	pub fn text_for(&self, app_label: &str) -> String {
		self.text.replace(LABEL_PLACEHOLDER, app_label)
	}

	pub fn offers_message_field(&self) -> bool {
		self.message_hint.is_some()
	}
}
