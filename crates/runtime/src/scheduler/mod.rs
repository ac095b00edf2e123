// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Cooperative process scheduler.
//!
//! The runtime owns every frame and a FIFO work queue. Each queued job is one
//! of: a channel delivery, a frame resumption, or a root spawn. Driving the
//! runtime (`run_until_idle`, `tick`, `run_for`, `block_on`) executes jobs one
//! at a time on the calling thread. Faults noticed by channel callbacks are
//! queued as jobs too, so they land in the same fault list. A step goes:
//!
//! 1. Resume the frame's process with its input
//! 2. `Err` → report, halt the frame (cleanups per config)
//! 3. `Complete(v)` → run cleanups in order, resume the parent with `v`
//! 4. `Select` → register a one-shot race on every channel
//! 5. `Delegate` → create a child frame and queue its first resumption
//!
//! Nothing is ever resumed synchronously, so delegation depth never turns into
//! native stack depth and a sender never runs receiver logic.

mod fault;
pub(crate) mod frame;
mod handle;
pub(crate) mod job;
mod select;

use std::{
	collections::{HashMap, HashSet},
	mem,
	time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
pub use fault::{Fault, Outcome};
pub use frame::{FrameId, FrameState};
pub use handle::RuntimeHandle;
pub use select::Select;
use tracing::{debug, error, trace, warn};

use crate::{
	channel::Channel,
	config::RuntimeConfig,
	error::{Error, Result},
	process::{Cx, Input, Source, Step, context::Deferred},
	scheduler::{frame::Frame, job::Job, select::Race},
};

/// Single-threaded driver for frames and channel deliveries.
///
/// Root outcomes and faults are retained until the host collects them with
/// [`take_outcome`](Self::take_outcome) and [`take_faults`](Self::take_faults).
/// `block_on` collects the outcome it waits for. A host that starts roots
/// without collecting their outcomes, or never drains faults, keeps every
/// entry alive for the lifetime of the runtime.
pub struct Runtime<M> {
	config: RuntimeConfig,
	handle: RuntimeHandle<M>,
	rx: Receiver<Job<M>>,
	frames: HashMap<FrameId, Frame<M>>,
	outcomes: HashMap<FrameId, Outcome<M>>,
	faults: Vec<Fault>,
}

impl<M: Send + 'static> Default for Runtime<M> {
	fn default() -> Self {
		Self::new()
	}
}

impl<M: Send + 'static> Runtime<M> {
	pub fn new() -> Self {
		Self::with_config(RuntimeConfig::default())
	}

	pub fn with_config(config: RuntimeConfig) -> Self {
		let (tx, rx) = unbounded();
		let handle = RuntimeHandle::new(tx, config.default_capacity);

		Self {
			config,
			handle,
			rx,
			frames: HashMap::new(),
			outcomes: HashMap::new(),
			faults: Vec::new(),
		}
	}

	pub fn config(&self) -> &RuntimeConfig {
		&self.config
	}

	pub fn handle(&self) -> RuntimeHandle<M> {
		self.handle.clone()
	}

	pub fn channel<T: Send + 'static>(&self, capacity: usize) -> Channel<T> {
		self.handle.channel(capacity)
	}

	pub fn unbounded<T: Send + 'static>(&self) -> Channel<T> {
		self.handle.unbounded()
	}

	pub fn rendezvous<T: Send + 'static>(&self) -> Channel<T> {
		self.handle.rendezvous()
	}

	/// Create a root frame and queue its first resumption.
	///
	/// A builder source runs immediately, with a context bound to the new frame.
	pub fn start(&mut self, source: Source<M>) -> FrameId {
		let frame = FrameId::next();
		self.create(frame, source, None);
		frame
	}

	/// Execute queued jobs until the queue is empty. Never blocks.
	pub fn run_until_idle(&mut self) -> usize {
		let mut executed = 0;
		while let Ok(job) = self.rx.try_recv() {
			self.execute(job);
			executed += 1;
		}
		executed
	}

	/// Execute at most `step_budget` queued jobs, returning control to the host.
	pub fn tick(&mut self) -> usize {
		let budget = self.config.step_budget.max(1);
		let mut executed = 0;
		while executed < budget {
			match self.rx.try_recv() {
				Ok(job) => {
					self.execute(job);
					executed += 1;
				}
				Err(_) => break,
			}
		}
		executed
	}

	/// Execute jobs as they arrive until `duration` elapses.
	///
	/// A duration too long to express as a deadline means no deadline: the
	/// loop then runs until the work queue disconnects, which never happens
	/// while the runtime itself holds a handle.
	pub fn run_for(&mut self, duration: Duration) -> usize {
		let mut executed = 0;
		let Some(deadline) = deadline_after(duration) else {
			while let Ok(job) = self.rx.recv() {
				self.execute(job);
				executed += 1;
			}
			return executed;
		};

		loop {
			let now = Instant::now();
			if now >= deadline {
				return executed;
			}

			match self.rx.recv_timeout(deadline - now) {
				Ok(job) => {
					self.execute(job);
					executed += 1;
				}
				Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return executed,
			}
		}
	}

	/// Drive the runtime until `root` finishes, returning its value.
	///
	/// A timeout too long to express as a deadline waits without one.
	pub fn block_on(&mut self, root: FrameId, timeout: Duration) -> Result<M> {
		let Some(deadline) = deadline_after(timeout) else {
			loop {
				if let Some(outcome) = self.outcomes.remove(&root) {
					return outcome.into_result();
				}
				match self.rx.recv() {
					Ok(job) => self.execute(job),
					Err(_) => return Err(Error::ShutDown),
				}
			}
		};

		loop {
			if let Some(outcome) = self.outcomes.remove(&root) {
				return outcome.into_result();
			}

			let now = Instant::now();
			if now >= deadline {
				return Err(Error::Timeout(timeout));
			}

			match self.rx.recv_timeout(deadline - now) {
				Ok(job) => self.execute(job),
				Err(RecvTimeoutError::Timeout) => {}
				Err(RecvTimeoutError::Disconnected) => return Err(Error::ShutDown),
			}
		}
	}

	/// Outcome of a finished root, kept until taken.
	pub fn outcome(&self, root: FrameId) -> Option<&Outcome<M>> {
		self.outcomes.get(&root)
	}

	pub fn take_outcome(&mut self, root: FrameId) -> Option<Outcome<M>> {
		self.outcomes.remove(&root)
	}

	/// Faults recorded since the last `take_faults`.
	pub fn faults(&self) -> &[Fault] {
		&self.faults
	}

	/// Remove and return every recorded fault.
	pub fn take_faults(&mut self) -> Vec<Fault> {
		mem::take(&mut self.faults)
	}

	/// Frames created and not yet finished, including ones blocked forever.
	pub fn live_frames(&self) -> usize {
		self.frames.len()
	}

	pub fn is_live(&self, frame: FrameId) -> bool {
		self.frames.contains_key(&frame)
	}

	pub fn frame_state(&self, frame: FrameId) -> Option<FrameState> {
		self.frames.get(&frame).map(|frame| frame.state)
	}

	pub fn pending_jobs(&self) -> usize {
		self.rx.len()
	}

	fn execute(&mut self, job: Job<M>) {
		match job {
			Job::Deliver(task) => task(),
			Job::Resume {
				frame,
				epoch,
				input,
			} => self.advance(frame, epoch, input),
			Job::Spawn {
				frame,
				source,
			} => self.create(frame, source, None),
			Job::Report(fault) => {
				error!(frame = %fault.frame(), fault = ?fault, "fault reported");
				self.faults.push(fault);
			}
		}
	}

	fn create(&mut self, id: FrameId, source: Source<M>, parent: Option<FrameId>) {
		let mut cx = Cx::new(id, Vec::new(), self.handle.clone());
		let process = source.build(&mut cx);
		self.frames.insert(id, Frame::new(process, cx.into_deferred(), parent));

		match parent {
			Some(parent) => debug!(frame = %id, parent = %parent, "child frame created"),
			None => debug!(frame = %id, "root frame created"),
		}
		self.handle.resume(id, 0, Input::Start);
	}

	fn advance(&mut self, id: FrameId, epoch: u64, input: Input<M>) {
		let Some(frame) = self.frames.get_mut(&id) else {
			trace!(frame = %id, "resume for finished frame ignored");
			return;
		};
		if frame.epoch != epoch {
			debug!(frame = %id, expected = frame.epoch, got = epoch, "stale resume ignored");
			return;
		}
		let Some(mut process) = frame.process.take() else {
			warn!(frame = %id, "frame is already being stepped");
			return;
		};
		frame.epoch += 1;

		let mut cx = Cx::new(id, mem::take(&mut frame.deferred), self.handle.clone());
		let result = process.resume(input, &mut cx);

		frame.process = Some(process);
		frame.deferred = cx.into_deferred();

		match result {
			Ok(Step::Select(select)) => self.select(id, select),
			Ok(Step::Delegate(source)) => self.delegate(id, source),
			Ok(Step::Complete(value)) => self.complete(id, value),
			Err(err) => self.fail(id, err),
		}
	}

	fn select(&mut self, id: FrameId, select: Select<M>) {
		let mut seen = HashSet::new();
		let mut arms = select.into_arms();
		arms.retain(|arm| {
			let fresh = seen.insert(arm.channel());
			if !fresh {
				warn!(frame = %id, channel = %arm.channel(), "duplicate channel in select ignored");
			}
			fresh
		});

		if arms.is_empty() {
			self.fail(id, Error::malformed("select over no channels"));
			return;
		}

		let Some(frame) = self.frames.get_mut(&id) else {
			return;
		};
		frame.state = FrameState::Selecting;
		let epoch = frame.epoch;
		trace!(frame = %id, channels = arms.len(), "frame waiting on select");

		let handle = self.handle.clone();
		let reporter = self.handle.clone();
		let race = Race::new(
			move |channel, message| {
				handle.resume(
					id,
					epoch,
					Input::Message {
						channel,
						message,
					},
				)
			},
			move |channel| {
				reporter.report(Fault::MessageLost {
					frame: id,
					channel,
				})
			},
		);
		for arm in arms {
			race.arm(arm);
		}
	}

	fn delegate(&mut self, id: FrameId, source: Source<M>) {
		let Some(frame) = self.frames.get_mut(&id) else {
			return;
		};
		let child = FrameId::next();
		frame.state = FrameState::Delegating(child);
		debug!(frame = %id, child = %child, "delegating to child");
		self.create(child, source, Some(id));
	}

	fn complete(&mut self, id: FrameId, value: M) {
		let Some(Frame {
			deferred,
			parent,
			..
		}) = self.frames.remove(&id)
		else {
			return;
		};
		self.run_deferred(id, deferred);

		match parent {
			Some(parent) => self.return_to(parent, id, value),
			None => {
				debug!(frame = %id, "root process completed");
				self.outcomes.insert(id, Outcome::Completed(value));
			}
		}
	}

	fn return_to(&mut self, parent: FrameId, child: FrameId, value: M) {
		match self.frames.get(&parent) {
			Some(frame) if frame.state == FrameState::Delegating(child) => {
				trace!(frame = %child, parent = %parent, "child completed, resuming parent");
				self.handle.resume(parent, frame.epoch, Input::Returned(value));
			}
			Some(_) => warn!(frame = %child, parent = %parent, "parent is not waiting on this child"),
			None => warn!(frame = %child, parent = %parent, "parent frame is gone, child value dropped"),
		}
	}

	fn fail(&mut self, id: FrameId, err: Error) {
		error!(frame = %id, code = err.code(), error = %err, "process step failed");
		self.faults.push(Fault::step_failed(id, &err));

		let Some(Frame {
			deferred,
			parent,
			..
		}) = self.frames.remove(&id)
		else {
			return;
		};

		if self.config.run_deferred_on_failure {
			self.run_deferred(id, deferred);
		} else if !deferred.is_empty() {
			debug!(frame = %id, skipped = deferred.len(), "cleanups skipped for failed frame");
		}

		match parent {
			// Failures never resume the parent; it stays suspended.
			Some(parent) => debug!(frame = %id, parent = %parent, "child failed, parent left waiting"),
			None => {
				self.outcomes.insert(id, Outcome::Failed(err));
			}
		}
	}

	fn run_deferred(&mut self, id: FrameId, deferred: Vec<Deferred>) {
		for (index, cleanup) in deferred.into_iter().enumerate() {
			if let Err(err) = cleanup() {
				error!(frame = %id, index, code = err.code(), error = %err, "deferred cleanup failed");
				self.faults.push(Fault::cleanup_failed(id, index, &err));
			}
		}
	}
}

/// `None` when `duration` from now overflows `Instant`.
fn deadline_after(duration: Duration) -> Option<Instant> {
	Instant::now().checked_add(duration)
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use sluice_testing::Recorder;

	use super::*;

	fn nest(depth: u32) -> Source<u32> {
		Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input {
				Input::Start if depth == 0 => Ok(Step::Complete(0)),
				Input::Start => Ok(cx.delegate(nest(depth - 1))),
				Input::Returned(value) => Ok(Step::Complete(value + 1)),
				Input::Message {
					..
				} => Err(Error::malformed("unexpected message")),
			}
		})
	}

	fn note(log: &Recorder<String>, entry: &str) -> impl FnOnce() -> Result<()> + Send + 'static {
		let log = log.clone();
		let entry = entry.to_string();
		move || {
			log.push(entry);
			Ok(())
		}
	}

	#[test]
	fn test_root_completes_with_value() {
		let mut runtime = Runtime::<u32>::new();
		let root = runtime.start(Source::from_fn(|_: Input<u32>, _: &mut Cx<u32>| -> Result<Step<u32>> {
			Ok(Step::Complete(11))
		}));

		assert!(runtime.is_live(root));
		assert_eq!(runtime.frame_state(root), Some(FrameState::Ready));
		runtime.run_until_idle();

		assert!(!runtime.is_live(root));
		assert!(runtime.outcome(root).is_some_and(Outcome::is_completed));
		assert_eq!(runtime.take_outcome(root).map(|o| o.into_result().ok()), Some(Some(11)));
		assert!(runtime.take_outcome(root).is_none());
	}

	#[test]
	fn test_cleanups_run_in_order_before_parent_resumes() {
		let mut runtime = Runtime::<u32>::new();
		let log = Recorder::new();

		let l = log.clone();
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input {
				Input::Start => {
					cx.defer(note(&l, "parent cleanup"));
					let child_log = l.clone();
					Ok(cx.delegate(Source::builder(move |cx: &mut Cx<u32>| {
						cx.defer(note(&child_log, "child first"));
						cx.defer(note(&child_log, "child second"));
						|_: Input<u32>, _: &mut Cx<u32>| -> Result<Step<u32>> { Ok(Step::Complete(5)) }
					})))
				}
				Input::Returned(value) => {
					l.push(format!("parent resumed with {value}"));
					Ok(Step::Complete(value * 2))
				}
				Input::Message {
					..
				} => Err(Error::malformed("unexpected message")),
			}
		}));

		assert_eq!(runtime.block_on(root, Duration::from_secs(1)).ok(), Some(10));
		assert_eq!(
			log.snapshot(),
			vec!["child first", "child second", "parent resumed with 5", "parent cleanup"]
		);
		assert_eq!(runtime.live_frames(), 0);
		assert!(runtime.faults().is_empty());
	}

	#[test]
	fn test_failing_cleanup_does_not_stop_the_rest() {
		let mut runtime = Runtime::<u32>::new();
		let log = Recorder::new();

		let l = log.clone();
		let root = runtime.start(Source::builder(move |cx: &mut Cx<u32>| {
			cx.defer(note(&l, "first"));
			cx.defer(|| Err(Error::process("cleanup broke")));
			cx.defer(note(&l, "third"));
			|_: Input<u32>, _: &mut Cx<u32>| -> Result<Step<u32>> { Ok(Step::Complete(1)) }
		}));

		assert_eq!(runtime.block_on(root, Duration::from_secs(1)).ok(), Some(1));
		assert_eq!(log.snapshot(), vec!["first", "third"]);

		let faults = runtime.take_faults();
		assert_eq!(faults.len(), 1);
		assert!(matches!(
			&faults[0],
			Fault::CleanupFailed { frame, index: 1, code: "RT_001", .. } if *frame == root
		));
		assert!(runtime.faults().is_empty());
	}

	#[test]
	fn test_failed_step_runs_cleanups_and_halts() {
		let mut runtime = Runtime::<u32>::new();
		let log = Recorder::new();

		let l = log.clone();
		let root = runtime.start(Source::from_fn(move |_: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			cx.defer(note(&l, "cleanup"));
			Err(Error::process("boom"))
		}));
		runtime.run_until_idle();

		assert_eq!(log.snapshot(), vec!["cleanup"]);
		assert!(!runtime.is_live(root));
		assert!(matches!(runtime.take_outcome(root), Some(Outcome::Failed(Error::Process(_)))));
		assert!(matches!(runtime.faults(), [Fault::StepFailed { code: "RT_001", .. }]));
	}

	#[test]
	fn test_failed_step_skips_cleanups_when_disabled() {
		let mut runtime = Runtime::<u32>::with_config(RuntimeConfig::new().run_deferred_on_failure(false));
		let log = Recorder::new();

		let l = log.clone();
		let root = runtime.start(Source::from_fn(move |_: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			cx.defer(note(&l, "cleanup"));
			Err(Error::process("boom"))
		}));

		assert!(runtime.block_on(root, Duration::from_secs(1)).is_err());
		assert!(log.is_empty());
	}

	#[test]
	fn test_failed_child_leaves_parent_suspended() {
		let mut runtime = Runtime::<u32>::new();
		let resumed = Recorder::new();

		let r = resumed.clone();
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input {
				Input::Start => Ok(cx.delegate(Source::from_fn(
					|_: Input<u32>, _: &mut Cx<u32>| -> Result<Step<u32>> { Err(Error::process("child failed")) },
				))),
				_ => {
					r.push(());
					Ok(Step::Complete(0))
				}
			}
		}));
		runtime.run_until_idle();

		assert!(resumed.is_empty());
		assert!(runtime.is_live(root));
		assert!(matches!(runtime.frame_state(root), Some(FrameState::Delegating(_))));
		assert!(runtime.outcome(root).is_none());
		assert_eq!(runtime.faults().len(), 1);
		assert_ne!(runtime.faults()[0].frame(), root);
	}

	#[test]
	fn test_deep_delegation_does_not_grow_the_stack() {
		let mut runtime = Runtime::<u32>::new();
		let root = runtime.start(nest(1000));

		assert_eq!(runtime.block_on(root, Duration::from_secs(5)).ok(), Some(1000));
		assert_eq!(runtime.live_frames(), 0);
	}

	#[test]
	fn test_select_resolves_once_and_restores_the_loser() {
		let mut runtime = Runtime::<u32>::new();
		let x = runtime.channel::<u32>(4);
		let y = runtime.channel::<u32>(4);
		x.send(1);
		y.send(2);

		let wins = Recorder::new();
		let w = wins.clone();
		let (xs, ys) = (x.clone(), y.clone());
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input {
				Input::Start => Ok(cx.wait(Select::new().recv(&xs).recv(&ys))),
				Input::Message {
					channel,
					message,
				} => {
					w.push((channel, message));
					Ok(Step::Complete(message))
				}
				Input::Returned(_) => Err(Error::malformed("unexpected return")),
			}
		}));
		runtime.run_until_idle();

		assert_eq!(wins.snapshot(), vec![(x.id(), 1)]);
		assert_eq!(y.drain(), vec![2]);
		assert!(!x.has_receiver());
		assert!(!y.has_receiver());
		assert_eq!(runtime.take_outcome(root).and_then(|o| o.into_result().ok()), Some(1));
	}

	#[test]
	fn test_select_cancels_losing_registrations() {
		let mut runtime = Runtime::<u32>::new();
		let x = runtime.channel::<u32>(4);
		let y = runtime.channel::<u32>(4);

		let (xs, ys) = (x.clone(), y.clone());
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input {
				Input::Start => Ok(cx.wait(Select::new().recv(&xs).recv(&ys))),
				Input::Message {
					message,
					..
				} => Ok(Step::Complete(message)),
				Input::Returned(_) => Err(Error::malformed("unexpected return")),
			}
		}));
		runtime.run_until_idle();

		assert_eq!(runtime.frame_state(root), Some(FrameState::Selecting));
		assert!(x.has_receiver());
		assert!(y.has_receiver());

		assert!(y.send(7));
		runtime.run_until_idle();
		assert!(!x.has_receiver());
		assert_eq!(runtime.take_outcome(root).and_then(|o| o.into_result().ok()), Some(7));

		assert!(x.send(8));
		runtime.run_until_idle();
		assert_eq!(x.drain(), vec![8]);
	}

	#[test]
	fn test_duplicate_channels_in_select_are_collapsed() {
		let mut runtime = Runtime::<u32>::new();
		let x = runtime.channel::<u32>(4);
		x.send(1);
		x.send(2);

		let xs = x.clone();
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input {
				Input::Start => Ok(cx.wait(Select::new().recv(&xs).recv(&xs))),
				Input::Message {
					message,
					..
				} => Ok(Step::Complete(message)),
				Input::Returned(_) => Err(Error::malformed("unexpected return")),
			}
		}));

		assert_eq!(runtime.block_on(root, Duration::from_secs(1)).ok(), Some(1));
		assert_eq!(x.drain(), vec![2]);
	}

	#[test]
	fn test_empty_select_is_malformed() {
		let mut runtime = Runtime::<u32>::new();
		let root = runtime.start(Source::from_fn(|_: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			Ok(cx.wait(Select::new()))
		}));

		let err = runtime.block_on(root, Duration::from_secs(1)).unwrap_err();
		assert_eq!(err.code(), "RT_003");
		assert!(matches!(runtime.faults(), [Fault::StepFailed { code: "RT_003", .. }]));
	}

	#[test]
	fn test_stale_resume_is_ignored() {
		let mut runtime = Runtime::<u32>::new();
		let channel = runtime.channel::<u32>(1);
		let steps = Recorder::new();

		let s = steps.clone();
		let c = channel.clone();
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			s.push(());
			match input.into_message() {
				Some((_, message)) => Ok(Step::Complete(message)),
				None => Ok(cx.wait(Select::from(&c))),
			}
		}));
		runtime.run_until_idle();
		assert_eq!(steps.len(), 1);

		runtime.handle().resume(root, 0, Input::Start);
		runtime.run_until_idle();
		assert_eq!(steps.len(), 1);
		assert_eq!(runtime.frame_state(root), Some(FrameState::Selecting));

		channel.send(3);
		assert_eq!(runtime.block_on(root, Duration::from_secs(1)).ok(), Some(3));
		assert_eq!(steps.len(), 2);
	}

	#[test]
	fn test_tick_respects_step_budget() {
		let mut runtime = Runtime::<u32>::with_config(RuntimeConfig::new().step_budget(2));
		let root = runtime.start(nest(3));

		assert_eq!(runtime.pending_jobs(), 1);
		let mut ticks = 0;
		while runtime.outcome(root).is_none() {
			assert!(runtime.tick() <= 2);
			ticks += 1;
		}
		assert!(ticks > 1);
		assert_eq!(runtime.tick(), 0);
	}

	#[test]
	fn test_block_on_times_out() {
		let mut runtime = Runtime::<u32>::new();
		let never = runtime.channel::<u32>(1);
		let root = runtime.start(Source::from_fn(move |_: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			Ok(cx.wait(Select::from(&never)))
		}));

		let err = runtime.block_on(root, Duration::from_millis(20)).unwrap_err();
		assert!(matches!(err, Error::Timeout(_)));
		assert!(runtime.is_live(root));
	}

	#[test]
	fn test_unrepresentable_deadline_means_none() {
		assert!(deadline_after(Duration::MAX).is_none());
		assert!(deadline_after(Duration::from_secs(1)).is_some());
	}

	#[test]
	fn test_block_on_without_deadline() {
		let mut runtime = Runtime::<u32>::new();
		let channel = runtime.channel::<u32>(1);
		let c = channel.clone();
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input.into_message() {
				Some((_, message)) => Ok(Step::Complete(message)),
				None => Ok(cx.wait(Select::from(&c))),
			}
		}));

		let producer = channel.clone();
		let sender = std::thread::spawn(move || {
			std::thread::sleep(Duration::from_millis(10));
			producer.send(6)
		});

		assert_eq!(runtime.block_on(root, Duration::MAX).ok(), Some(6));
		assert!(sender.join().unwrap());
	}

	#[test]
	fn test_run_for_stops_at_deadline() {
		let mut runtime = Runtime::<u32>::new();
		runtime.start(nest(2));

		assert_eq!(runtime.run_for(Duration::from_millis(20)), 5);
		assert_eq!(runtime.live_frames(), 0);
	}

	#[test]
	fn test_run_for_without_deadline_keeps_serving() {
		let mut runtime = Runtime::<u32>::new();
		let handle = runtime.handle();
		let finished = Recorder::new();

		std::thread::spawn(move || runtime.run_for(Duration::MAX));

		for n in 0..3 {
			let f = finished.clone();
			handle
				.spawn(Source::from_fn(move |_: Input<u32>, _: &mut Cx<u32>| -> Result<Step<u32>> {
					f.push(n);
					Ok(Step::Complete(n))
				}))
				.unwrap();
		}
		sluice_testing::wait_for(|| finished.len() == 3, "roots should run under an open-ended run_for");
		assert_eq!(finished.snapshot(), vec![0, 1, 2]);
	}

	#[test]
	fn test_late_arm_on_rendezvous_channel_reports_lost_message() {
		let mut runtime = Runtime::<u32>::new();
		let x = runtime.rendezvous::<u32>();
		let y = runtime.rendezvous::<u32>();

		let (xs, ys) = (x.clone(), y.clone());
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input.into_message() {
				Some((_, message)) => Ok(Step::Complete(message)),
				None => Ok(cx.wait(Select::new().recv(&xs).recv(&ys))),
			}
		}));
		runtime.run_until_idle();
		assert!(x.has_receiver() && y.has_receiver());

		assert!(x.send(1));
		assert!(y.send(2));
		runtime.run_until_idle();

		assert_eq!(runtime.take_outcome(root).and_then(|o| o.into_result().ok()), Some(1));
		assert!(y.is_empty());
		assert_eq!(
			runtime.take_faults(),
			vec![Fault::MessageLost {
				frame: root,
				channel: y.id(),
			}]
		);
	}

	#[test]
	fn test_late_arm_restores_when_both_were_handed_a_message() {
		let mut runtime = Runtime::<u32>::new();
		let x = runtime.channel::<u32>(1);
		let y = runtime.channel::<u32>(1);

		let (xs, ys) = (x.clone(), y.clone());
		let root = runtime.start(Source::from_fn(move |input: Input<u32>, cx: &mut Cx<u32>| -> Result<Step<u32>> {
			match input.into_message() {
				Some((_, message)) => Ok(Step::Complete(message)),
				None => Ok(cx.wait(Select::new().recv(&xs).recv(&ys))),
			}
		}));
		runtime.run_until_idle();

		assert!(x.send(1));
		assert!(y.send(2));
		runtime.run_until_idle();

		assert_eq!(runtime.take_outcome(root).and_then(|o| o.into_result().ok()), Some(1));
		assert_eq!(y.drain(), vec![2]);
		assert!(runtime.faults().is_empty());
	}

	#[test]
	fn test_collected_outcomes_and_faults_are_released() {
		let mut runtime = Runtime::<u32>::new();
		let roots: Vec<_> = (0..4)
			.map(|n| {
				runtime.start(Source::from_fn(move |_: Input<u32>, _: &mut Cx<u32>| -> Result<Step<u32>> {
					if n % 2 == 0 {
						Ok(Step::Complete(n))
					} else {
						Err(Error::process("odd root"))
					}
				}))
			})
			.collect();
		runtime.run_until_idle();

		assert_eq!(runtime.faults().len(), 2);
		for root in &roots {
			assert!(runtime.take_outcome(*root).is_some());
			assert!(runtime.outcome(*root).is_none());
		}
		assert_eq!(runtime.take_faults().len(), 2);
		assert!(runtime.faults().is_empty());
	}

	#[test]
	fn test_spawn_from_handle_creates_root() {
		let mut runtime = Runtime::<u32>::new();
		let handle = runtime.handle();

		let root = std::thread::spawn(move || {
			handle.spawn(Source::from_fn(|_: Input<u32>, _: &mut Cx<u32>| -> Result<Step<u32>> {
				Ok(Step::Complete(4))
			}))
		})
		.join()
		.unwrap()
		.unwrap();

		assert!(!runtime.is_live(root));
		assert_eq!(runtime.block_on(root, Duration::from_secs(1)).ok(), Some(4));
	}
}
