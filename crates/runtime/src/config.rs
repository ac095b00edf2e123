// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Capacity used for channels created without an explicit bound.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Maximum number of queued jobs [`Runtime::tick`](crate::Runtime::tick) executes per call.
pub const DEFAULT_STEP_BUDGET: usize = 1024;

/// Configuration for runtime behavior.
///
/// Every field has a default, so partial documents deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
	/// Capacity of "effectively unbounded" channels.
	///
	/// Default: 10_000
	pub default_capacity: usize,

	/// Whether deferred cleanups of a frame run when its step fails.
	///
	/// Default: true
	pub run_deferred_on_failure: bool,

	/// Jobs executed by a single `tick`.
	///
	/// Default: 1024
	pub step_budget: usize,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			default_capacity: DEFAULT_CAPACITY,
			run_deferred_on_failure: true,
			step_budget: DEFAULT_STEP_BUDGET,
		}
	}
}

impl RuntimeConfig {
	/// Create a new config with default values.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the capacity used by `unbounded` channels.
	pub fn default_capacity(mut self, capacity: usize) -> Self {
		self.default_capacity = capacity;
		self
	}

	/// Choose whether cleanups run on the step-failure path.
	pub fn run_deferred_on_failure(mut self, enabled: bool) -> Self {
		self.run_deferred_on_failure = enabled;
		self
	}

	/// Set the per-tick job budget. Zero is treated as one.
	pub fn step_budget(mut self, budget: usize) -> Self {
		self.step_budget = budget.max(1);
		self
	}
}
