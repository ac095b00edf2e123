// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Cooperative channel and process runtime.
//!
//! This crate provides:
//! - Bounded FIFO channels with at most one pending receive registration
//! - A single-threaded scheduler stepping resumable processes
//! - Multi-channel select with an exactly-once winner
//! - Nested delegation to sub-processes and deferred cleanup actions
//! - A request/reply adapter over channels
//! - Timers that feed channels from a background thread
//!
//! # Architecture
//!
//! Every delivery and every resumption is queued on the runtime's work queue
//! and executed by [`Runtime`] when the host drives it. A send never runs
//! receiver logic on the sender's stack, and delegation chains never grow the
//! native stack.
//!
//! # Usage
//!
//! ```ignore
//! let mut runtime = Runtime::<u32>::new();
//! let numbers = runtime.channel::<u32>(4);
//!
//! let root = runtime.start(Source::from_fn({
//! 	let numbers = numbers.clone();
//! 	move |input, cx| match input {
//! 		Input::Start => Ok(cx.wait(Select::new().recv(&numbers))),
//! 		Input::Message { message, .. } => Ok(Step::Complete(message * 2)),
//! 		Input::Returned(_) => Err(Error::malformed("no delegation")),
//! 	}
//! }));
//!
//! numbers.send(21);
//! assert_eq!(runtime.block_on(root, Duration::from_secs(1))?, 42);
//! ```

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod channel;
pub mod config;
pub mod error;
pub mod process;
pub mod reply;
pub mod scheduler;
pub mod timer;

pub use channel::{Channel, ChannelId, Registration};
pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use process::{Cx, Input, Process, Source, Step};
pub use reply::{ReplyTo, Requester, serve};
pub use scheduler::{Fault, FrameId, FrameState, Outcome, Runtime, RuntimeHandle, Select};
pub use timer::{TimerHandle, after, schedule_once, schedule_repeat};
