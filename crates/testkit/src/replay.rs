//! Replay-determinism harness.
//!
//! A replay worldtest builds the same small simulation twice from scratch,
//! steps both for a fixed number of ticks and compares a canonical JSON
//! snapshot after every tick. Any divergence means some part of the tick
//! depends on state outside the seed (wall clock, hash order, global RNG).

use crate::snapshot::canonical_json;
use anyhow::{bail, Result};
use serde::Serialize;
use tileforge_core::SimTick;
use tracing::debug;

/// Configuration for a replay worldtest.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Human-readable name used in failure messages.
    pub name: String,
    /// Number of ticks to step after the initial snapshot.
    pub ticks: u64,
}

/// Summary of a passing replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Snapshots compared (initial plus one per tick).
    pub frames: usize,
    /// Hex blake3 digest over every frame of the run.
    pub digest: String,
}

/// Run two identical simulations side by side and require matching snapshots.
pub fn run_replay_worldtest<State, Snapshot, BuildFn, StepFn, SnapFn>(
    config: ReplayConfig,
    mut build: BuildFn,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> Result<ReplayReport>
where
    Snapshot: Serialize,
    BuildFn: FnMut() -> State,
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut first = build();
    let mut second = build();
    let mut hasher = blake3::Hasher::new();
    let mut tick = SimTick::ZERO;
    let mut frames = 0;

    loop {
        let a = canonical_json(&snapshot(tick, &first))?;
        let b = canonical_json(&snapshot(tick, &second))?;
        if a != b {
            bail!("{}: replay diverged at tick {}", config.name, tick.0);
        }
        hasher.update(a.as_bytes());
        frames += 1;

        if tick.0 >= config.ticks {
            break;
        }
        step(tick, &mut first);
        step(tick, &mut second);
        tick = tick.advance(1);
    }

    let digest = hasher.finalize().to_hex().to_string();
    debug!(name = %config.name, frames, %digest, "replay worldtest passed");
    Ok(ReplayReport { frames, digest })
}
