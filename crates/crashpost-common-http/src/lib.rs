// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for crashpost.
//!
//! This crate provides:
//! - A pre-configured blocking HTTP client builder with a consistent User-Agent header
//! - Classification of transport failures into the delivery error taxonomy

mod classify;
mod client;

pub use classify::{classify_error, classify_source_chain, classify_status, RETRYABLE_STATUSES};
pub use client::{blocking_builder, user_agent};
