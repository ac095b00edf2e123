// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Process frames.

use std::{
	fmt,
	sync::atomic::{AtomicU64, Ordering},
};

use crate::process::{Process, context::Deferred};

/// Identity of a frame. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

impl FrameId {
	pub(crate) fn next() -> Self {
		FrameId(FRAME_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for FrameId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "frame#{}", self.0)
	}
}

static FRAME_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where a live frame is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
	/// Created, first resumption queued.
	Ready,
	/// Waiting for a select to resolve.
	Selecting,
	/// Waiting for the child frame to complete.
	Delegating(FrameId),
}

/// One resumable computation plus its cleanups and parent link.
pub(crate) struct Frame<M> {
	/// `None` only while the process is being stepped.
	pub(crate) process: Option<Box<dyn Process<M>>>,
	pub(crate) deferred: Vec<Deferred>,
	pub(crate) parent: Option<FrameId>,
	/// Bumped on every resumption; queued resumes carry the epoch they expect.
	pub(crate) epoch: u64,
	pub(crate) state: FrameState,
}

impl<M> Frame<M> {
	pub(crate) fn new(process: Box<dyn Process<M>>, deferred: Vec<Deferred>, parent: Option<FrameId>) -> Self {
		Self {
			process: Some(process),
			deferred,
			parent,
			epoch: 0,
			state: FrameState::Ready,
		}
	}
}
