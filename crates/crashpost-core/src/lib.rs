// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the crashpost fault capture-and-delivery pipeline.
//!
//! This crate holds the pure parts of the pipeline: the immutable [`Report`]
//! value, the field filter applied before submission, the routing policy that
//! decides whether an automatic report may be sent at all, and the
//! [`DeliveryTask`] / [`Backoff`] pair that drives retries. It performs no I/O;
//! the `crashpost` SDK crate wires these types to the panic hook, the HTTP
//! transport and a timer facility.
//!
//! # Overview
//!
//! - [`Report`]: one fault occurrence plus environment context, never mutated
//! - [`FieldFilter`]: `all` or an explicit allow-list of wire field names
//! - [`RoutingPolicy`]: `SendNow` or `Suppress` for a freshly captured report
//! - [`DeliveryTask`]: a report plus its retry counter and unique [`TaskId`]
//! - [`Backoff`]: exponential delay (`2^n` seconds, capped) and the retry bound
//! - [`DeliveryError`]: the transport error taxonomy and its retry classification

pub mod backoff;
pub mod error;
pub mod filter;
pub mod policy;
pub mod prompt;
pub mod report;
pub mod task;

pub use backoff::{Backoff, DEFAULT_MAXIMUM_BACKOFF_EXPONENT, DEFAULT_MAXIMUM_RETRY_COUNT};
pub use error::{DeliveryError, Result};
pub use filter::{FieldFilter, ALL_FIELDS_TOKEN};
pub use policy::{Route, RouteDecision, RoutingPolicy, DEFAULT_NEW_PLATFORM_THRESHOLD};
pub use prompt::PromptText;
pub use report::{format_timestamp, Report, ReportField, TIMESTAMP_FORMAT, UNNAMED_THREAD};
pub use task::{DeliveryTask, TaskId};
