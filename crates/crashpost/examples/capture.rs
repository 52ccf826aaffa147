// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Report a manual error and a worker panic with the crashpost SDK.
//!
//! Run with:
//!   CRASHPOST_TARGET_URL=http://localhost:8080/report \
//!   CRASHPOST_REPORT_ON_NEW_PLATFORMS=true \
//!   RUST_LOG=crashpost=debug cargo run --example capture -p crashpost

use std::time::Duration;

use crashpost::{Dispatch, Reporter};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct SyncError {
	source: std::io::Error,
}

impl std::fmt::Display for SyncError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("failed to sync notes")
	}
}

impl std::error::Error for SyncError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.source)
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	// Configuration comes from $XDG_CONFIG_HOME/crashpost/config.toml and CRASHPOST_*.
	let reporter = Reporter::builder()
		.app_info(crashpost::app_info!())
		.build()?;

	println!("Reporting to {:?}", reporter.config().target_url);
	println!("Fields: {}", reporter.config().include_fields);

	reporter.install_panic_hook();

	println!("\nReporting a recoverable error...");
	let error = SyncError {
		source: std::io::Error::new(std::io::ErrorKind::TimedOut, "sync server timed out"),
	};
	match reporter.report_error(&error, Some("example run".to_string()))? {
		Dispatch::Prompted => println!("  handed to prompt"),
		Dispatch::Attempted(outcome) => println!("  outcome: {outcome:?}"),
	}

	println!("\nPanicking on a worker thread...");
	let worker = std::thread::Builder::new()
		.name("sync-worker".to_string())
		.spawn(|| {
			let notes: Vec<&str> = Vec::new();
			println!("first note: {}", notes[0]);
		})?;
	if worker.join().is_err() {
		println!("  worker panicked; the report was attempted before the default hook ran");
	}

	// Give scheduled retries a chance to fire before exiting.
	tokio::time::sleep(Duration::from_secs(3)).await;
	println!("\nDone.");

	Ok(())
}
