// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Sluice Contributors

#![cfg_attr(not(debug_assertions), deny(warnings))]

mod game;
mod stats;

use std::{
	env,
	thread::{self, JoinHandle},
	time::Duration,
};

use sluice_runtime::{Error, Requester, Result, Runtime, RuntimeConfig, Source, schedule_repeat};
use tracing::{error, info, warn};

use crate::{
	game::{Game, Inputs},
	stats::Stats,
};

/// The single message type flowing through the playground runtime.
#[derive(Debug)]
pub enum Msg {
	Click(u32),
	Tick,
	Visible(bool),
	Stats(Stats),
	Won(u32),
	Best(u32),
}

impl From<Stats> for Msg {
	fn from(request: Stats) -> Self {
		Msg::Stats(request)
	}
}

impl TryFrom<Msg> for Stats {
	type Error = Msg;

	fn try_from(msg: Msg) -> std::result::Result<Self, Msg> {
		match msg {
			Msg::Stats(request) => Ok(request),
			other => Err(other),
		}
	}
}

fn setup_logging() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.try_init();
}

/// Reads `SLUICE_CONFIG` as JSON, e.g. `{"step_budget": 64}`.
fn load_config() -> Result<RuntimeConfig> {
	match env::var("SLUICE_CONFIG") {
		Ok(json) => serde_json::from_str(&json).map_err(Error::other),
		Err(_) => Ok(RuntimeConfig::default()),
	}
}

/// Stands in for the UI event wiring: pushes clicks and visibility changes.
fn spawn_adapter(inputs: Inputs) -> Result<JoinHandle<()>> {
	let handle = thread::Builder::new().name("sluice-adapter".into()).spawn(move || {
		let pause = Duration::from_millis(20);

		inputs.clicks.send(9);
		for cell in [0, 1, 2] {
			thread::sleep(pause);
			inputs.clicks.send(cell);
		}

		inputs.visibility.send(false);
		thread::sleep(pause * 3);
		inputs.visibility.send(true);

		for cell in [2, 2, 3, 4] {
			thread::sleep(pause);
			inputs.clicks.send(cell);
		}
	})?;
	Ok(handle)
}

fn main() -> Result<()> {
	setup_logging();

	let mut runtime = Runtime::<Msg>::with_config(load_config()?);

	let inputs = Inputs {
		clicks: runtime.unbounded(),
		ticks: runtime.rendezvous(),
		visibility: runtime.channel(1),
	};

	let stats_requests = runtime.channel::<Stats>(16);
	let stats = Requester::new(stats_requests.clone());
	runtime.start(stats::service(stats_requests));

	let ticker = schedule_repeat(&inputs.ticks, Duration::from_millis(16), ())?;
	let root = runtime.start(Source::process(Game::new(game::round(inputs.clone(), ticker), stats.clone())));
	let adapter = spawn_adapter(inputs)?;

	match runtime.block_on(root, Duration::from_secs(10)) {
		Ok(Msg::Best(best)) => info!(best, "game finished"),
		Ok(other) => warn!(?other, "game finished with an unexpected value"),
		Err(err) => error!(code = err.code(), error = %err, "game did not finish"),
	}
	if adapter.join().is_err() {
		warn!("adapter thread panicked");
	}

	let best = stats.call(Stats::Best)?;
	runtime.run_until_idle();
	info!(best = ?best.try_recv().flatten(), "stats service queried from the host");

	for fault in runtime.take_faults() {
		warn!(frame = %fault.frame(), ?fault, "fault reported");
	}
	info!(live_frames = runtime.live_frames(), "playground done");
	Ok(())
}
