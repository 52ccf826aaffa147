// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and rendering for fault reports.

use std::backtrace::Backtrace;

/// A numbered frame and the `at <file>:<line>` lines that follow it.
#[derive(Debug)]
struct FrameBlock<'a> {
	function: &'a str,
	lines: Vec<&'a str>,
}

/// Render a backtrace as report text.
///
/// Leading frames that belong to the capture machinery (std panicking, the
/// backtrace itself, this SDK) are dropped so the trace starts at the code
/// that faulted. If no frame looks like application code the full trace is kept.
pub fn render_backtrace(backtrace: &Backtrace) -> String {
	trim_capture_frames(&backtrace.to_string())
}

fn trim_capture_frames(bt_string: &str) -> String {
	let (preamble, blocks) = parse_blocks(bt_string);
	if blocks.is_empty() {
		return bt_string.trim_end().to_string();
	}

	let first_app = blocks
		.iter()
		.position(|b| is_in_app_frame(b.function) && !is_sdk_frame(b.function))
		.unwrap_or(0);

	preamble
		.into_iter()
		.chain(blocks[first_app..].iter().flat_map(|b| b.lines.iter().copied()))
		.collect::<Vec<_>>()
		.join("\n")
}

fn parse_blocks(bt_string: &str) -> (Vec<&str>, Vec<FrameBlock<'_>>) {
	let mut preamble = Vec::new();
	let mut blocks: Vec<FrameBlock<'_>> = Vec::new();

	for line in bt_string.lines() {
		if let Some(function) = frame_function(line) {
			blocks.push(FrameBlock {
				function,
				lines: vec![line],
			});
		} else if let Some(block) = blocks.last_mut() {
			block.lines.push(line);
		} else if !line.trim().is_empty() {
			preamble.push(line);
		}
	}

	(preamble, blocks)
}

/// Returns the function name when `line` opens a frame (`  N: name`).
fn frame_function(line: &str) -> Option<&str> {
	let (number, rest) = line.trim_start().split_once(':')?;
	if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
		return None;
	}
	Some(rest.trim())
}

/// Determine if a frame is from application code vs the standard library.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"backtrace::",
		"<backtrace::",
		"panic_unwind::",
		"<panic_unwind::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
	];

	const SYSTEM_CONTAINS: &[&str] = &["::panic::", "::panicking::", "::sys_common::"];

	!SYSTEM_PREFIXES.iter().any(|p| function.starts_with(p))
		&& !SYSTEM_CONTAINS.iter().any(|c| function.contains(c))
}

fn is_sdk_frame(function: &str) -> bool {
	function.starts_with("crashpost::") || function.starts_with("<crashpost::")
}
