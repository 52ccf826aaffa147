// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field-inclusion filter applied before a report is submitted.

use std::collections::BTreeSet;
use std::fmt;

use crate::report::{Report, ReportField};

/// Token meaning "include every field".
pub const ALL_FIELDS_TOKEN: &str = "all";

/// Which report fields are sent to the collector.
///
/// Parsed from either [`ALL_FIELDS_TOKEN`] or a comma-separated allow-list of
/// field names. Each entry may use the wire name (`stackTrace`) or the legacy
/// name (`exStackTrace`). Absent optional fields are never emitted, whatever
/// the filter says.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldFilter {
	#[default]
	All,
	Only(BTreeSet<ReportField>),
}

impl FieldFilter {
	/// Parses an `include_fields` value. Unknown names are ignored; use
	/// [`FieldFilter::unknown_names`] to report them.
	pub fn parse(list: &str) -> Self {
		let mut fields = BTreeSet::new();
		for token in tokens(list) {
			if token == ALL_FIELDS_TOKEN {
				return Self::All;
			}
			if let Some(field) = ReportField::from_name(token) {
				fields.insert(field);
			}
		}
		Self::Only(fields)
	}

	/// Entries of an `include_fields` value that name no known field.
	pub fn unknown_names(list: &str) -> Vec<String> {
		tokens(list)
			.filter(|t| *t != ALL_FIELDS_TOKEN && ReportField::from_name(t).is_none())
			.map(str::to_string)
			.collect()
	}

	pub fn includes(&self, field: ReportField) -> bool {
		match self {
			Self::All => true,
			Self::Only(fields) => fields.contains(&field),
		}
	}

	/// Present, allowed fields as `(wire name, value)` pairs in emission order.
	pub fn apply(&self, report: &Report) -> Vec<(&'static str, String)> {
		report
			.fields()
			.into_iter()
			.filter(|(field, _)| self.includes(*field))
			.map(|(field, value)| (field.wire_name(), value))
			.collect()
	}
}

impl fmt::Display for FieldFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::All => f.write_str(ALL_FIELDS_TOKEN),
			Self::Only(fields) => {
				let names: Vec<_> = fields.iter().map(|field| field.wire_name()).collect();
				f.write_str(&names.join(","))
			}
		}
	}
}

fn tokens(list: &str) -> impl Iterator<Item = &str> {
	list.split(',').map(str::trim).filter(|t| !t.is_empty())
}
