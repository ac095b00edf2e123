// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Request/reply over channels.
//!
//! A service defines its operations as an enum whose variants carry the
//! arguments and a typed [`ReplyTo`]. Callers use a [`Requester`] to send an
//! envelope and get back the reply channel right away; a process built with
//! [`serve`] consumes the envelopes inside the scheduler and answers each one.
//!
//! ```ignore
//! enum Stats {
//!     Record { score: u32, reply: ReplyTo<u32> },
//!     Best(ReplyTo<Option<u32>>),
//! }
//!
//! let best = requester.call(Stats::Best)?;
//! // select on `best` from a process, or poll it from the host
//! ```

use std::fmt;

use tracing::{trace, warn};

use crate::{
	channel::{Channel, ChannelId},
	error::{Error, Result},
	process::{Cx, Input, Source, Step},
	scheduler::Select,
};

/// Single-use reply slot carried inside a request envelope.
pub struct ReplyTo<R> {
	channel: Channel<R>,
}

impl<R: Send + 'static> ReplyTo<R> {
	/// Answer the request. Returns `false` if the answer could not be buffered.
	pub fn reply(self, value: R) -> bool {
		let sent = self.channel.send(value);
		if !sent {
			warn!(channel = %self.channel.id(), "reply dropped");
		}
		sent
	}

	pub fn channel_id(&self) -> ChannelId {
		self.channel.id()
	}
}

impl<R> fmt::Debug for ReplyTo<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReplyTo").field("channel", &self.channel).finish()
	}
}

/// Sends request envelopes on a shared request channel.
pub struct Requester<Q> {
	requests: Channel<Q>,
}

impl<Q> Clone for Requester<Q> {
	fn clone(&self) -> Self {
		Self {
			requests: self.requests.clone(),
		}
	}
}

impl<Q: Send + 'static> Requester<Q> {
	pub fn new(requests: Channel<Q>) -> Self {
		Self {
			requests,
		}
	}

	pub fn requests(&self) -> &Channel<Q> {
		&self.requests
	}

	/// Send the envelope built by `request` and return its reply channel.
	///
	/// The reply channel holds one value, so the answer is kept until the
	/// caller gets to it.
	pub fn call<R, F>(&self, request: F) -> Result<Channel<R>>
	where
		R: Send + 'static,
		F: FnOnce(ReplyTo<R>) -> Q,
	{
		let reply = self.requests.sibling::<R>(1);
		let envelope = request(ReplyTo {
			channel: reply.clone(),
		});

		if !self.requests.send(envelope) {
			warn!(channel = %self.requests.id(), "request rejected, channel full");
			return Err(Error::RequestRejected {
				channel: self.requests.id(),
			});
		}

		trace!(channel = %self.requests.id(), reply = %reply.id(), "request sent");
		Ok(reply)
	}
}

/// A process that answers every request arriving on `requests`.
///
/// Runs until `handler` returns an error, which fails the frame. Requests
/// travel through the runtime as `M`, hence the conversions both ways.
pub fn serve<Q, M, H>(requests: Channel<Q>, mut handler: H) -> Source<M>
where
	Q: TryFrom<M> + Send + 'static,
	M: From<Q> + Send + 'static,
	H: FnMut(Q) -> Result<()> + Send + 'static,
{
	Source::from_fn(move |input: Input<M>, cx: &mut Cx<M>| -> Result<Step<M>> {
		match input {
			Input::Start => {}
			Input::Message {
				message,
				..
			} => {
				let request = Q::try_from(message)
					.map_err(|_| Error::malformed("request channel yielded a foreign message"))?;
				handler(request)?;
			}
			Input::Returned(_) => return Err(Error::malformed("request server never delegates")),
		}
		Ok(cx.wait(Select::new().recv(&requests)))
	})
}
