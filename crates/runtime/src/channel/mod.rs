// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Bounded FIFO channels.
//!
//! A channel buffers up to `capacity` messages and holds at most one pending
//! receive registration. A send hands the message straight to the pending
//! registration when there is one, otherwise it buffers or rejects.
//!
//! Delivery to a registration is never performed on the caller's stack: the
//! callback is posted to the owning runtime's work queue and executed when the
//! runtime is driven.

use std::{
	collections::VecDeque,
	fmt,
	sync::{
		Arc, Weak,
		atomic::{AtomicU64, Ordering},
	},
};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::scheduler::job::Dispatcher;

/// Opaque channel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl From<u64> for ChannelId {
	fn from(value: u64) -> Self {
		ChannelId(value)
	}
}

impl fmt::Display for ChannelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "chan#{}", self.0)
	}
}

static CHANNEL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_channel_id() -> ChannelId {
	ChannelId(CHANNEL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Token identifying one `register` call on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration(u64);

type Hook<T> = Box<dyn FnOnce(T) + Send>;

struct Pending<T> {
	token: Registration,
	hook: Hook<T>,
}

struct State<T> {
	buffer: VecDeque<T>,
	capacity: usize,
	pending: Option<Pending<T>>,
	next_token: u64,
}

struct Inner<T> {
	id: ChannelId,
	state: Mutex<State<T>>,
	dispatcher: Dispatcher,
}

/// A FIFO message conduit with a fixed capacity.
///
/// Cloning a channel yields another handle to the same conduit.
pub struct Channel<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for Channel<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> PartialEq for Channel<T> {
	fn eq(&self, other: &Self) -> bool {
		self.inner.id == other.inner.id
	}
}

impl<T> Eq for Channel<T> {}

impl<T> fmt::Debug for Channel<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("Channel")
			.field("id", &self.inner.id)
			.field("capacity", &state.capacity)
			.field("len", &state.buffer.len())
			.field("has_receiver", &state.pending.is_some())
			.finish()
	}
}

impl<T: Send + 'static> Channel<T> {
	pub(crate) fn new(capacity: usize, dispatcher: Dispatcher) -> Self {
		Self {
			inner: Arc::new(Inner {
				id: next_channel_id(),
				state: Mutex::new(State {
					buffer: VecDeque::new(),
					capacity,
					pending: None,
					next_token: 0,
				}),
				dispatcher,
			}),
		}
	}

	/// Create a channel of another message type on the same runtime.
	pub(crate) fn sibling<U: Send + 'static>(&self, capacity: usize) -> Channel<U> {
		Channel::new(capacity, self.inner.dispatcher.clone())
	}

	pub fn id(&self) -> ChannelId {
		self.inner.id
	}

	pub fn capacity(&self) -> usize {
		self.inner.state.lock().capacity
	}

	/// Number of buffered messages.
	pub fn len(&self) -> usize {
		self.inner.state.lock().buffer.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.state.lock().buffer.is_empty()
	}

	/// Whether a receive registration is currently pending.
	pub fn has_receiver(&self) -> bool {
		self.inner.state.lock().pending.is_some()
	}

	/// Send a message.
	///
	/// Returns `false` if the message was dropped because no receiver is
	/// pending and the buffer is full. A capacity-0 channel therefore only
	/// accepts messages while a receiver is registered.
	pub fn send(&self, message: T) -> bool {
		let mut state = self.inner.state.lock();

		if let Some(pending) = state.pending.take() {
			drop(state);
			self.deliver(pending.hook, message);
			return true;
		}

		if state.buffer.len() < state.capacity {
			state.buffer.push_back(message);
			return true;
		}

		trace!(channel = %self.inner.id, capacity = state.capacity, "send rejected, channel full");
		false
	}

	/// Register a receive callback.
	///
	/// If a message is buffered the oldest one is delivered right away (still
	/// through the work queue) and the registration is consumed. Otherwise the
	/// callback replaces any registration that is still pending.
	pub fn register<F>(&self, callback: F) -> Registration
	where
		F: FnOnce(T) + Send + 'static,
	{
		let mut state = self.inner.state.lock();
		state.next_token += 1;
		let token = Registration(state.next_token);

		if let Some(message) = state.buffer.pop_front() {
			drop(state);
			self.deliver(Box::new(callback), message);
			return token;
		}

		if state.pending.is_some() {
			trace!(channel = %self.inner.id, "replacing pending registration");
		}
		state.pending = Some(Pending {
			token,
			hook: Box::new(callback),
		});
		token
	}

	/// Clear the pending registration, if any, without delivering.
	pub fn cancel(&self) -> bool {
		self.inner.state.lock().pending.take().is_some()
	}

	/// Clear the pending registration only if it is the one identified by `token`.
	pub fn cancel_registration(&self, token: Registration) -> bool {
		let mut state = self.inner.state.lock();
		match &state.pending {
			Some(pending) if pending.token == token => {
				state.pending = None;
				true
			}
			_ => false,
		}
	}

	/// Remove and return every buffered message. A pending registration is kept.
	pub fn drain(&self) -> Vec<T> {
		self.inner.state.lock().buffer.drain(..).collect()
	}

	/// Pop the oldest buffered message without registering.
	pub fn try_recv(&self) -> Option<T> {
		self.inner.state.lock().buffer.pop_front()
	}

	/// Put back a message that was handed to a registration which no longer wants it.
	///
	/// The message is older than anything buffered since, so it goes to the head.
	pub(crate) fn restore(&self, message: T) -> bool {
		let mut state = self.inner.state.lock();

		if let Some(pending) = state.pending.take() {
			drop(state);
			self.deliver(pending.hook, message);
			return true;
		}

		if state.buffer.len() < state.capacity {
			state.buffer.push_front(message);
			return true;
		}

		false
	}

	pub(crate) fn downgrade(&self) -> WeakChannel<T> {
		WeakChannel {
			id: self.inner.id,
			inner: Arc::downgrade(&self.inner),
		}
	}

	fn deliver(&self, hook: Hook<T>, message: T) {
		let task = Box::new(move || hook(message));
		if !self.inner.dispatcher.dispatch(task) {
			warn!(channel = %self.inner.id, "runtime shut down, delivery dropped");
		}
	}
}

/// Non-owning channel handle, held by select hooks and timers.
pub(crate) struct WeakChannel<T> {
	id: ChannelId,
	inner: Weak<Inner<T>>,
}

impl<T> Clone for WeakChannel<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			inner: self.inner.clone(),
		}
	}
}

impl<T> WeakChannel<T> {
	pub(crate) fn id(&self) -> ChannelId {
		self.id
	}

	pub(crate) fn upgrade(&self) -> Option<Channel<T>> {
		self.inner.upgrade().map(|inner| Channel {
			inner,
		})
	}
}
