// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Helpers for testing code driven by the sluice runtime.

pub mod recorder;
pub mod util;

pub use recorder::Recorder;
pub use util::wait::{wait_for, wait_for_condition};

/// Install a test-friendly tracing subscriber. Safe to call from every test.
///
/// Honors `RUST_LOG`; output is captured by the test harness.
pub fn init_test_logging() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
