// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared, cloneable log of values observed by callbacks and processes.
///
/// Clones append to the same log, so a clone can be moved into a `Send`
/// closure while the test keeps another to assert on.
pub struct Recorder<T> {
	entries: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
	fn clone(&self) -> Self {
		Self {
			entries: self.entries.clone(),
		}
	}
}

impl<T> Default for Recorder<T> {
	fn default() -> Self {
		Self {
			entries: Arc::new(Mutex::new(Vec::new())),
		}
	}
}

impl<T> Recorder<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&self, entry: T) {
		self.entries.lock().push(entry);
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Remove and return everything recorded so far.
	pub fn take(&self) -> Vec<T> {
		std::mem::take(&mut *self.entries.lock())
	}
}

impl<T: Clone> Recorder<T> {
	pub fn snapshot(&self) -> Vec<T> {
		self.entries.lock().clone()
	}

	pub fn last(&self) -> Option<T> {
		self.entries.lock().last().cloned()
	}
}
