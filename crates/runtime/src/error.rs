// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! Runtime error types.

use std::time::Duration;

use crate::channel::ChannelId;

/// Result type for runtime operations and process steps.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A process step failed with a message.
	#[error("process failed: {0}")]
	Process(String),

	/// A process step failed with a foreign error.
	#[error(transparent)]
	Other(#[from] Box<dyn std::error::Error + Send + Sync>),

	/// A process asked the scheduler for something it cannot do.
	#[error("malformed step: {0}")]
	MalformedStep(String),

	/// The request channel was full and dropped the request envelope.
	#[error("request rejected: {channel} is full")]
	RequestRejected {
		channel: ChannelId,
	},

	#[error("timed out after {0:?}")]
	Timeout(Duration),

	/// The runtime's work queue is gone.
	#[error("runtime shut down")]
	ShutDown,

	/// A timer thread could not be spawned.
	#[error("failed to spawn timer thread: {0}")]
	Spawn(#[from] std::io::Error),
}

impl Error {
	pub fn process(message: impl Into<String>) -> Self {
		Error::Process(message.into())
	}

	pub fn malformed(message: impl Into<String>) -> Self {
		Error::MalformedStep(message.into())
	}

	pub fn other<E>(err: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		Error::Other(Box::new(err))
	}

	/// Stable diagnostic code for this error.
	pub fn code(&self) -> &'static str {
		match self {
			Error::Process(_) => "RT_001",
			Error::Other(_) => "RT_002",
			Error::MalformedStep(_) => "RT_003",
			Error::RequestRejected {
				..
			} => "RT_004",
			Error::Timeout(_) => "RT_005",
			Error::ShutDown => "RT_006",
			Error::Spawn(_) => "RT_007",
		}
	}
}
