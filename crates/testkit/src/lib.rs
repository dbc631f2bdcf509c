#![warn(missing_docs)]
//! Deterministic testing surfaces: event logs, world fingerprints and replay checks.

mod replay;
mod snapshot;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tileforge_core::SimTick;
use tileforge_world::TileWorld;

pub use replay::*;
pub use snapshot::canonical_json;

/// One line of a headless event log.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Peer that produced the event.
    pub peer: &'a str,
    /// Short kind label.
    pub kind: &'a str,
    /// Structured payload.
    pub payload: serde_json::Value,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    out: BufWriter<File>,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Hex blake3 digest over a world's dimensions and block and wall layers.
///
/// Two worlds with the same fingerprint have byte-identical tile layers.
pub fn world_fingerprint(world: &TileWorld) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(world.width() as u64).to_le_bytes());
    hasher.update(&(world.height() as u64).to_le_bytes());
    hasher.update(&world.block_bytes());
    hasher.update(&world.wall_bytes());
    hasher.finalize().to_hex().to_string()
}
