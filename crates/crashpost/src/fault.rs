// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The captured fault a report is built from.

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt::Write as _;

use crate::backtrace::render_backtrace;

/// Payload class used when a panic payload is neither `&str` nor `String`.
pub const OPAQUE_PAYLOAD: &str = "Box<dyn Any>";

/// A panic or error reduced to the text a report carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
	/// Payload type for panics, the error's type name otherwise.
	pub class: String,
	pub message: Option<String>,
	/// Full trace text: header, location or cause chain, then the backtrace.
	pub trace: String,
}

impl Fault {
	/// Build a fault from the parts of a panic.
	///
	/// `location` is `file:line:column` when the panic carried one.
	pub fn from_panic(
		class: &str,
		message: Option<String>,
		location: Option<&str>,
		backtrace: &Backtrace,
	) -> Self {
		let mut trace = format!("panicked at {}:", location.unwrap_or("<unknown>"));
		if let Some(message) = &message {
			trace.push('\n');
			trace.push_str(message);
		}
		trace.push_str("\nstack backtrace:\n");
		trace.push_str(&render_backtrace(backtrace));

		Self {
			class: class.to_string(),
			message,
			trace,
		}
	}

	/// Build a fault from a recoverable error, capturing a backtrace at the call site.
	pub fn from_error<E>(error: &E) -> Self
	where
		E: StdError + 'static,
	{
		Self::from_error_with_backtrace(
			std::any::type_name::<E>(),
			error,
			&Backtrace::force_capture(),
		)
	}

	/// Build a fault from a type-erased error.
	pub fn from_error_with_backtrace(
		class: &str,
		error: &(dyn StdError + 'static),
		backtrace: &Backtrace,
	) -> Self {
		let message = error.to_string();
		let mut trace = format!("{class}: {message}");
		let mut source = error.source();
		while let Some(cause) = source {
			let _ = write!(trace, "\nCaused by: {cause}");
			source = cause.source();
		}
		trace.push_str("\nstack backtrace:\n");
		trace.push_str(&render_backtrace(backtrace));

		Self {
			class: class.to_string(),
			message: Some(message),
			trace,
		}
	}
}

/// Split a panic payload into its class and message.
pub fn panic_payload(payload: &(dyn Any + Send)) -> (&'static str, String) {
	if let Some(s) = payload.downcast_ref::<&str>() {
		("&str", (*s).to_string())
	} else if let Some(s) = payload.downcast_ref::<String>() {
		("String", s.clone())
	} else {
		(OPAQUE_PAYLOAD, OPAQUE_PAYLOAD.to_string())
	}
}
