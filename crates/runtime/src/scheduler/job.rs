// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Work queue entries.

use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::{
	process::{Input, Source},
	scheduler::{fault::Fault, frame::FrameId},
};

/// A type-erased unit of work, used for channel deliveries.
pub(crate) type Task = Box<dyn FnOnce() + Send>;

/// Entries drained by the runtime loop, strictly in FIFO order.
pub(crate) enum Job<M> {
	/// Run a delivery callback.
	Deliver(Task),
	/// Step a frame with an input, if it is still waiting at `epoch`.
	Resume {
		frame: FrameId,
		epoch: u64,
		input: Input<M>,
	},
	/// Create a root frame requested through a handle.
	Spawn {
		frame: FrameId,
		source: Source<M>,
	},
	/// Record a fault noticed outside the runtime loop.
	Report(Fault),
}

/// Posts delivery tasks onto a runtime's queue without knowing its message type.
#[derive(Clone)]
pub(crate) struct Dispatcher {
	post: Arc<dyn Fn(Task) -> bool + Send + Sync>,
}

impl Dispatcher {
	pub(crate) fn new<M: Send + 'static>(tx: Sender<Job<M>>) -> Self {
		Self {
			post: Arc::new(move |task| tx.send(Job::Deliver(task)).is_ok()),
		}
	}

	/// Queue a task. Returns `false` when the runtime is gone.
	pub(crate) fn dispatch(&self, task: Task) -> bool {
		(self.post)(task)
	}
}
