// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Resumable processes.
//!
//! This module defines the contract between the scheduler and the work it runs:
//! - [`Process`]: a computation stepped with an [`Input`], yielding a [`Step`]
//! - [`Step`]: what the process asks for next (select, delegate, or complete)
//! - [`Source`]: how a frame obtains its process (ready-made or built)
//! - [`Cx`]: the capability object handed to every step

pub(crate) mod context;

pub use context::Cx;

use crate::{channel::ChannelId, error::Result, scheduler::Select};

/// Value a process is resumed with.
#[derive(Debug)]
pub enum Input<M> {
	/// First resumption of a fresh frame.
	Start,
	/// A select resolved: the winning channel and its message.
	Message {
		channel: ChannelId,
		message: M,
	},
	/// A delegated child completed with this value.
	Returned(M),
}

impl<M> Input<M> {
	pub fn is_start(&self) -> bool {
		matches!(self, Input::Start)
	}

	/// The `(channel, message)` pair of a resolved select.
	pub fn into_message(self) -> Option<(ChannelId, M)> {
		match self {
			Input::Message {
				channel,
				message,
			} => Some((channel, message)),
			_ => None,
		}
	}

	/// The completion value of a delegated child.
	pub fn into_returned(self) -> Option<M> {
		match self {
			Input::Returned(value) => Some(value),
			_ => None,
		}
	}
}

/// What a process wants after a step.
pub enum Step<M> {
	/// Suspend until one of the channels yields a message.
	Select(Select<M>),
	/// Suspend until the sub-process completes; its value resumes this frame.
	Delegate(Source<M>),
	/// Finish with a final value.
	Complete(M),
}

impl<M> std::fmt::Debug for Step<M> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Step::Select(select) => f.debug_tuple("Select").field(&select.channels()).finish(),
			Step::Delegate(_) => f.write_str("Delegate"),
			Step::Complete(_) => f.write_str("Complete"),
		}
	}
}

/// A resumable computation.
///
/// The scheduler calls `resume` once per resumption and never concurrently
/// with itself. Everything a process does between two resumptions must be
/// synchronous; suspension happens only by returning [`Step::Select`] or
/// [`Step::Delegate`].
///
/// # Example
///
/// ```ignore
/// struct Countdown {
///     left: u32,
///     ticks: Channel<()>,
/// }
///
/// impl Process<Msg> for Countdown {
///     fn resume(&mut self, input: Input<Msg>, cx: &mut Cx<Msg>) -> Result<Step<Msg>> {
///         if !input.is_start() {
///             self.left -= 1;
///         }
///         if self.left == 0 {
///             return Ok(Step::Complete(Msg::Done));
///         }
///         Ok(cx.wait(Select::new().recv_map(&self.ticks, |()| Msg::Tick)))
///     }
/// }
/// ```
pub trait Process<M>: Send {
	fn resume(&mut self, input: Input<M>, cx: &mut Cx<M>) -> Result<Step<M>>;
}

impl<M, F> Process<M> for F
where
	F: FnMut(Input<M>, &mut Cx<M>) -> Result<Step<M>> + Send,
{
	fn resume(&mut self, input: Input<M>, cx: &mut Cx<M>) -> Result<Step<M>> {
		self(input, cx)
	}
}

type Builder<M> = Box<dyn FnOnce(&mut Cx<M>) -> Box<dyn Process<M>> + Send>;

/// Where a new frame gets its process from.
pub enum Source<M> {
	/// An already-initialised process.
	Ready(Box<dyn Process<M>>),
	/// A builder run when the frame is created; cleanups it defers belong to that frame.
	Builder(Builder<M>),
}

impl<M: 'static> Source<M> {
	pub fn process<P>(process: P) -> Self
	where
		P: Process<M> + 'static,
	{
		Source::Ready(Box::new(process))
	}

	pub fn from_fn<F>(step: F) -> Self
	where
		F: FnMut(Input<M>, &mut Cx<M>) -> Result<Step<M>> + Send + 'static,
	{
		Source::Ready(Box::new(step))
	}

	pub fn builder<F, P>(build: F) -> Self
	where
		F: FnOnce(&mut Cx<M>) -> P + Send + 'static,
		P: Process<M> + 'static,
	{
		Source::Builder(Box::new(move |cx| Box::new(build(cx)) as Box<dyn Process<M>>))
	}

	pub(crate) fn build(self, cx: &mut Cx<M>) -> Box<dyn Process<M>> {
		match self {
			Source::Ready(process) => process,
			Source::Builder(build) => build(cx),
		}
	}
}
