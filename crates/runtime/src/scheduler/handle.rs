// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::{
	channel::Channel,
	error::{Error, Result},
	process::{Input, Source},
	scheduler::{
		fault::Fault,
		frame::FrameId,
		job::{Dispatcher, Job},
	},
};

/// Cloneable, thread-safe handle to a runtime's work queue.
///
/// Used to create channels and spawn root processes from outside the loop:
/// host adapters, timer threads, or processes already running.
pub struct RuntimeHandle<M> {
	tx: Sender<Job<M>>,
	default_capacity: usize,
}

impl<M> Clone for RuntimeHandle<M> {
	fn clone(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			default_capacity: self.default_capacity,
		}
	}
}

impl<M: Send + 'static> RuntimeHandle<M> {
	pub(crate) fn new(tx: Sender<Job<M>>, default_capacity: usize) -> Self {
		Self {
			tx,
			default_capacity,
		}
	}

	/// Create a channel holding at most `capacity` buffered messages.
	pub fn channel<T: Send + 'static>(&self, capacity: usize) -> Channel<T> {
		Channel::new(capacity, Dispatcher::new(self.tx.clone()))
	}

	/// Create a channel bounded only by the configured default capacity.
	pub fn unbounded<T: Send + 'static>(&self) -> Channel<T> {
		self.channel(self.default_capacity)
	}

	/// Create a capacity-0 channel: sends succeed only against a pending receiver.
	pub fn rendezvous<T: Send + 'static>(&self) -> Channel<T> {
		self.channel(0)
	}

	/// Queue the creation of a new root frame.
	pub fn spawn(&self, source: Source<M>) -> Result<FrameId> {
		let frame = FrameId::next();
		self.tx.send(Job::Spawn {
			frame,
			source,
		})
		.map_err(|_| Error::ShutDown)?;
		debug!(frame = %frame, "root process spawn queued");
		Ok(frame)
	}

	pub(crate) fn resume(&self, frame: FrameId, epoch: u64, input: Input<M>) {
		let job = Job::Resume {
			frame,
			epoch,
			input,
		};
		if self.tx.send(job).is_err() {
			warn!(frame = %frame, "runtime shut down, resumption dropped");
		}
	}

	pub(crate) fn report(&self, fault: Fault) {
		let frame = fault.frame();
		if self.tx.send(Job::Report(fault)).is_err() {
			warn!(frame = %frame, "runtime shut down, fault dropped");
		}
	}
}
