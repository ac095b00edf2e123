// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Timer implementation using std::thread.

use std::{
	sync::atomic::Ordering,
	thread,
	time::Duration,
};

use tracing::{debug, trace};

use super::{TimerHandle, next_timer_id};
use crate::{channel::Channel, error::Result, scheduler::RuntimeHandle};

/// Send `message` on `channel` once `delay` has elapsed.
///
/// The timer holds no strong reference to the channel; if every handle is
/// dropped before it fires, nothing is sent.
pub fn schedule_once<T: Send + 'static>(channel: &Channel<T>, delay: Duration, message: T) -> Result<TimerHandle> {
	let handle = TimerHandle::new(next_timer_id());
	let cancelled = handle.cancelled_flag();
	let target = channel.downgrade();
	let id = handle.id();

	thread::Builder::new().name(format!("sluice-timer-{id}")).spawn(move || {
		thread::sleep(delay);

		if cancelled.load(Ordering::SeqCst) {
			trace!(timer = id, "timer cancelled before firing");
			return;
		}
		match target.upgrade() {
			Some(channel) => {
				if !channel.send(message) {
					debug!(timer = id, channel = %channel.id(), "timer message dropped, channel full");
				}
			}
			None => trace!(timer = id, channel = %target.id(), "timer target channel dropped"),
		}
	})?;

	Ok(handle)
}

/// Send a clone of `message` on `channel` every `interval`.
///
/// Stops when cancelled or when the channel has been dropped. Sends that the
/// channel rejects are skipped, not retried.
pub fn schedule_repeat<T: Send + Clone + 'static>(
	channel: &Channel<T>,
	interval: Duration,
	message: T,
) -> Result<TimerHandle> {
	let handle = TimerHandle::new(next_timer_id());
	let cancelled = handle.cancelled_flag();
	let target = channel.downgrade();
	let id = handle.id();

	thread::Builder::new().name(format!("sluice-timer-{id}")).spawn(move || {
		loop {
			thread::sleep(interval);

			if cancelled.load(Ordering::SeqCst) {
				break;
			}

			let Some(channel) = target.upgrade() else {
				// Channel is gone, stop the timer
				break;
			};
			if !channel.send(message.clone()) {
				trace!(timer = id, channel = %channel.id(), "tick skipped, channel full");
			}
		}
		debug!(timer = id, "repeating timer stopped");
	})?;

	Ok(handle)
}

/// A new single-slot channel that receives `()` once `delay` has elapsed.
///
/// Select on it next to other channels to bound how long a process waits.
pub fn after<M: Send + 'static>(runtime: &RuntimeHandle<M>, delay: Duration) -> Result<(Channel<()>, TimerHandle)> {
	let channel = runtime.channel(1);
	let timer = schedule_once(&channel, delay, ())?;
	Ok((channel, timer))
}
