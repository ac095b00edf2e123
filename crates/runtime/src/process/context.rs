// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Process execution context.
//!
//! The context provides a stepping process with:
//! - Suspension requests (`wait`, `delegate`)
//! - Cleanup registration on the current frame (`defer`)
//! - The runtime handle, for creating channels and spawning other roots

use crate::{
	channel::Channel,
	error::Result,
	process::{Source, Step},
	scheduler::{FrameId, RuntimeHandle, Select},
};

/// A cleanup action registered against a frame.
pub(crate) type Deferred = Box<dyn FnOnce() -> Result<()> + Send>;

/// Capabilities available to a process while it is being stepped.
pub struct Cx<M> {
	frame: FrameId,
	deferred: Vec<Deferred>,
	handle: RuntimeHandle<M>,
}

impl<M: Send + 'static> Cx<M> {
	pub(crate) fn new(frame: FrameId, deferred: Vec<Deferred>, handle: RuntimeHandle<M>) -> Self {
		Self {
			frame,
			deferred,
			handle,
		}
	}

	pub(crate) fn into_deferred(self) -> Vec<Deferred> {
		self.deferred
	}

	/// The frame currently executing.
	pub fn frame(&self) -> FrameId {
		self.frame
	}

	/// Suspend until one channel of `select` yields a message.
	pub fn wait(&self, select: Select<M>) -> Step<M> {
		Step::Select(select)
	}

	/// Suspend until `source` runs to completion in a child frame.
	pub fn delegate(&self, source: Source<M>) -> Step<M> {
		Step::Delegate(source)
	}

	/// Register a cleanup on the current frame.
	///
	/// Cleanups run once, in registration order, when the frame completes.
	/// A failing cleanup is reported and does not stop the ones after it.
	pub fn defer<F>(&mut self, cleanup: F)
	where
		F: FnOnce() -> Result<()> + Send + 'static,
	{
		self.deferred.push(Box::new(cleanup));
	}

	/// Number of cleanups registered on the current frame so far.
	pub fn deferred(&self) -> usize {
		self.deferred.len()
	}

	pub fn handle(&self) -> &RuntimeHandle<M> {
		&self.handle
	}

	pub fn channel<T: Send + 'static>(&self, capacity: usize) -> Channel<T> {
		self.handle.channel(capacity)
	}

	/// Start an independent root process.
	pub fn spawn(&self, source: Source<M>) -> Result<FrameId> {
		self.handle.spawn(source)
	}
}
