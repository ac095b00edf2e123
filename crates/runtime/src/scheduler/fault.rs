// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Reported faults and root outcomes.

use crate::{
	channel::ChannelId,
	error::{Error, Result},
	scheduler::frame::FrameId,
};

/// A problem reported by the scheduler. Faults never cross frame boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
	/// A step returned an error, or asked for something malformed; the frame halted.
	StepFailed {
		frame: FrameId,
		code: &'static str,
		message: String,
	},
	/// A deferred cleanup returned an error; later cleanups still ran.
	CleanupFailed {
		frame: FrameId,
		index: usize,
		code: &'static str,
		message: String,
	},
	/// A select arm lost the race after its channel had accepted a message,
	/// and the channel had no room to take the message back.
	MessageLost {
		frame: FrameId,
		channel: ChannelId,
	},
}

impl Fault {
	pub fn frame(&self) -> FrameId {
		match self {
			Fault::StepFailed {
				frame,
				..
			}
			| Fault::CleanupFailed {
				frame,
				..
			}
			| Fault::MessageLost {
				frame,
				..
			} => *frame,
		}
	}

	pub(crate) fn step_failed(frame: FrameId, err: &Error) -> Self {
		Fault::StepFailed {
			frame,
			code: err.code(),
			message: err.to_string(),
		}
	}

	pub(crate) fn cleanup_failed(frame: FrameId, index: usize, err: &Error) -> Self {
		Fault::CleanupFailed {
			frame,
			index,
			code: err.code(),
			message: err.to_string(),
		}
	}
}

/// How a root frame finished.
#[derive(Debug)]
pub enum Outcome<M> {
	Completed(M),
	Failed(Error),
}

impl<M> Outcome<M> {
	pub fn is_completed(&self) -> bool {
		matches!(self, Outcome::Completed(_))
	}

	pub fn into_result(self) -> Result<M> {
		match self {
			Outcome::Completed(value) => Ok(value),
			Outcome::Failed(err) => Err(err),
		}
	}
}
