// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

use sluice_runtime::{Channel, ReplyTo, Source, serve};
use tracing::info;

use crate::Msg;

/// Operations of the stats service.
#[derive(Debug)]
pub enum Stats {
	/// Record a finished game; replies with the best move count so far.
	Record {
		moves: u32,
		reply: ReplyTo<u32>,
	},
	Best(ReplyTo<Option<u32>>),
}

pub fn service(requests: Channel<Stats>) -> Source<Msg> {
	let mut best: Option<u32> = None;
	let mut games = 0u32;

	serve(requests, move |request| {
		match request {
			Stats::Record {
				moves,
				reply,
			} => {
				games += 1;
				let record = best.map_or(moves, |best| best.min(moves));
				if best != Some(record) {
					info!(moves, games, "new best");
				}
				best = Some(record);
				reply.reply(record);
			}
			Stats::Best(reply) => {
				reply.reply(best);
			}
		}
		Ok(())
	})
}
