// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Multi-channel select.
//!
//! A select registers one shared, one-shot winner callback on every channel it
//! names. The first callback to execute claims the race, cancels the other
//! registrations and resumes the waiting frame. Execution order is the work
//! queue's order, so the winner is the first registered callback to fire, not
//! necessarily the earliest sent message.
//!
//! Two arms can both be handed a message before either callback runs. The
//! late arm then finds the race claimed and puts its message back at the head
//! of its channel, or hands it to a receiver registered there since. A
//! capacity-0 channel, or one that filled up in the meantime, cannot take the
//! message back: it is dropped even though its `send` returned `true`, and the
//! loss is reported as [`Fault::MessageLost`](super::Fault::MessageLost).

use std::{
	mem,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::channel::{Channel, ChannelId};

/// Set of channels a process waits on, each with a conversion into `M`.
pub struct Select<M> {
	arms: Vec<Box<dyn Arm<M>>>,
}

impl<M: Send + 'static> Default for Select<M> {
	fn default() -> Self {
		Self::new()
	}
}

impl<M: Send + 'static> Select<M> {
	pub fn new() -> Self {
		Self {
			arms: Vec::new(),
		}
	}

	/// Wait on a channel whose messages convert into `M`.
	pub fn recv<T>(self, channel: &Channel<T>) -> Self
	where
		T: Into<M> + Send + 'static,
	{
		self.recv_map(channel, |message| message.into())
	}

	/// Wait on a channel, mapping its message into `M` if it wins.
	pub fn recv_map<T, F>(mut self, channel: &Channel<T>, map: F) -> Self
	where
		T: Send + 'static,
		F: FnOnce(T) -> M + Send + 'static,
	{
		self.arms.push(Box::new(ChannelArm {
			channel: channel.clone(),
			map: Box::new(map),
		}));
		self
	}
}

impl<M> Select<M> {
	/// Channels in arm order.
	pub fn channels(&self) -> Vec<ChannelId> {
		self.arms.iter().map(|arm| arm.channel()).collect()
	}

	pub fn len(&self) -> usize {
		self.arms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.arms.is_empty()
	}

	pub(crate) fn into_arms(self) -> Vec<Box<dyn Arm<M>>> {
		self.arms
	}
}

impl<M: Send + 'static> From<&Channel<M>> for Select<M> {
	fn from(channel: &Channel<M>) -> Self {
		Select::new().recv(channel)
	}
}

impl<M: Send + 'static> From<&[Channel<M>]> for Select<M> {
	fn from(channels: &[Channel<M>]) -> Self {
		channels.iter().fold(Select::new(), |select, channel| select.recv(channel))
	}
}

type Canceller = Box<dyn FnOnce() + Send>;

/// One channel of a select, type-erased over the channel's message type.
pub(crate) trait Arm<M>: Send {
	fn channel(&self) -> ChannelId;

	/// Register on the channel; the returned closure withdraws that registration.
	fn register(self: Box<Self>, race: Arc<Race<M>>) -> Canceller;
}

struct ChannelArm<T, M> {
	channel: Channel<T>,
	map: Box<dyn FnOnce(T) -> M + Send>,
}

impl<T: Send + 'static, M: 'static> Arm<M> for ChannelArm<T, M> {
	fn channel(&self) -> ChannelId {
		self.channel.id()
	}

	fn register(self: Box<Self>, race: Arc<Race<M>>) -> Canceller {
		let ChannelArm {
			channel,
			map,
		} = *self;
		let weak = channel.downgrade();
		let origin = weak.clone();

		let token = channel.register(move |message: T| {
			let id = origin.id();
			if race.claim() {
				race.settle(id, map(message));
				return;
			}

			let restored = origin.upgrade().map(|channel| channel.restore(message)).unwrap_or(false);
			if restored {
				trace!(channel = %id, "select already resolved, message restored");
			} else {
				warn!(channel = %id, "select already resolved, message dropped");
				(race.lost)(id);
			}
		});

		Box::new(move || {
			if let Some(channel) = weak.upgrade() {
				channel.cancel_registration(token);
			}
		})
	}
}

/// Shared state of one select: the one-shot flag and the losers to cancel.
pub(crate) struct Race<M> {
	won: AtomicBool,
	cancellers: Mutex<Vec<(ChannelId, Canceller)>>,
	resume: Box<dyn Fn(ChannelId, M) + Send + Sync>,
	lost: Box<dyn Fn(ChannelId) + Send + Sync>,
}

impl<M: 'static> Race<M> {
	/// `resume` receives the winning message; `lost` is told about a late
	/// message that could not be put back.
	pub(crate) fn new<F, L>(resume: F, lost: L) -> Arc<Self>
	where
		F: Fn(ChannelId, M) + Send + Sync + 'static,
		L: Fn(ChannelId) + Send + Sync + 'static,
	{
		Arc::new(Self {
			won: AtomicBool::new(false),
			cancellers: Mutex::new(Vec::new()),
			resume: Box::new(resume),
			lost: Box::new(lost),
		})
	}

	pub(crate) fn arm(self: &Arc<Self>, arm: Box<dyn Arm<M>>) {
		let id = arm.channel();
		let cancel = arm.register(self.clone());
		self.cancellers.lock().push((id, cancel));
	}

	fn claim(&self) -> bool {
		self.won.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
	}

	fn settle(&self, winner: ChannelId, message: M) {
		let losers = mem::take(&mut *self.cancellers.lock());
		for (id, cancel) in losers {
			if id != winner {
				cancel();
			}
		}
		(self.resume)(winner, message);
	}
}
