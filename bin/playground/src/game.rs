// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

//! A toy lights-out board: every click toggles one cell, the round is won once
//! all cells are lit.

use sluice_runtime::{
	Channel, Cx, Error, Input, Process, Requester, Result, Select, Source, Step, TimerHandle,
};
use tracing::{debug, info, trace, warn};

use crate::{Msg, stats::Stats};

const CELLS: u32 = 5;

/// Channels the host feeds.
#[derive(Clone)]
pub struct Inputs {
	pub clicks: Channel<u32>,
	/// Rendezvous: a tick is only taken while the round is waiting for one.
	pub ticks: Channel<()>,
	pub visibility: Channel<bool>,
}

struct Round {
	inputs: Inputs,
	lit: u32,
	moves: u32,
	frames: u32,
	visible: bool,
}

impl Round {
	fn solved(&self) -> bool {
		self.lit == (1 << CELLS) - 1
	}
}

impl Process<Msg> for Round {
	fn resume(&mut self, input: Input<Msg>, cx: &mut Cx<Msg>) -> Result<Step<Msg>> {
		match input {
			Input::Start => info!(frame = %cx.frame(), cells = CELLS, "round started"),
			Input::Message {
				message: Msg::Click(cell),
				..
			} => {
				if cell >= CELLS {
					warn!(cell, "click outside the board ignored");
				} else {
					self.moves += 1;
					self.lit ^= 1 << cell;
					debug!(cell, moves = self.moves, lit = self.lit, "cell toggled");
					if self.solved() {
						info!(moves = self.moves, frames = self.frames, "board lit");
						return Ok(Step::Complete(Msg::Won(self.moves)));
					}
				}
			}
			Input::Message {
				message: Msg::Tick,
				..
			} => {
				if self.visible {
					self.frames += 1;
					trace!(frames = self.frames, "render pass");
				}
			}
			Input::Message {
				message: Msg::Visible(visible),
				..
			} => {
				self.visible = visible;
				debug!(visible, "visibility changed");
			}
			other => return Err(Error::malformed(format!("round cannot handle {other:?}"))),
		}

		Ok(cx.wait(
			Select::new()
				.recv_map(&self.inputs.clicks, Msg::Click)
				.recv_map(&self.inputs.ticks, |()| Msg::Tick)
				.recv_map(&self.inputs.visibility, Msg::Visible),
		))
	}
}

/// One round of play. The tick timer is stopped when the round's frame completes.
pub fn round(inputs: Inputs, ticker: TimerHandle) -> Source<Msg> {
	Source::builder(move |cx: &mut Cx<Msg>| {
		let frame = cx.frame();
		cx.defer(move || {
			ticker.cancel();
			debug!(frame = %frame, timer = ticker.id(), "tick timer stopped");
			Ok(())
		});

		Round {
			inputs,
			lit: 0,
			moves: 0,
			frames: 0,
			visible: true,
		}
	})
}

/// Root process: plays a round, then records the result with the stats service.
pub struct Game {
	round: Option<Source<Msg>>,
	stats: Requester<Stats>,
}

impl Game {
	pub fn new(round: Source<Msg>, stats: Requester<Stats>) -> Self {
		Self {
			round: Some(round),
			stats,
		}
	}
}

impl Process<Msg> for Game {
	fn resume(&mut self, input: Input<Msg>, cx: &mut Cx<Msg>) -> Result<Step<Msg>> {
		match input {
			Input::Start => {
				let round = self.round.take().ok_or_else(|| Error::malformed("game started twice"))?;
				Ok(cx.delegate(round))
			}
			Input::Returned(Msg::Won(moves)) => {
				info!(moves, "puzzle solved");
				let best = self.stats.call(|reply| Stats::Record {
					moves,
					reply,
				})?;
				Ok(cx.wait(Select::new().recv_map(&best, Msg::Best)))
			}
			Input::Message {
				message: Msg::Best(best),
				..
			} => Ok(Step::Complete(Msg::Best(best))),
			other => Err(Error::malformed(format!("game cannot handle {other:?}"))),
		}
	}
}
