//! tileforge - a deterministic 2D tile sandbox
//!
//! Headless runner: one host and any number of joiners exchange real
//! protocol frames over in-process channels for a fixed number of frames.

mod config;
mod loopback;
mod save;
mod scripted_input;

use anyhow::Result;
use clap::Parser;
use config::SessionConfig;
use loopback::LoopbackSession;
use std::path::PathBuf;
use tileforge_core::DebugToggles;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless tileforge session runner", long_about = None)]
struct Args {
    /// Session config file (TOML)
    #[arg(long, default_value = config::DEFAULT_SESSION_PATH)]
    config: PathBuf,

    /// World seed
    #[arg(long)]
    seed: Option<u32>,

    /// Room id the loopback host listens on
    #[arg(long)]
    room: Option<String>,

    /// Number of simulated joiners
    #[arg(long)]
    joiners: Option<usize>,

    /// Frames to run
    #[arg(long)]
    ticks: Option<u64>,

    /// Write a PNG of the host's view after the run
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Save the host's world after the run
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume the host from a saved world instead of generating one
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write every peer's simulation events as JSON lines
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Scripted input (JSON) for the host player
    #[arg(long)]
    input_script: Option<PathBuf>,

    /// Ignore damage and never die
    #[arg(long)]
    god_mode: bool,

    /// Break blocks in a single tick
    #[arg(long)]
    insta_mine: bool,

    /// Disable collision and gravity for the host player
    #[arg(long)]
    no_clip: bool,

    /// Remove the interaction reach limit
    #[arg(long)]
    infinite_reach: bool,
}

impl Args {
    fn apply(self, mut config: SessionConfig) -> SessionConfig {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(room) = self.room {
            config.room = room;
        }
        if let Some(joiners) = self.joiners {
            config.peers = joiners;
        }
        if let Some(ticks) = self.ticks {
            config.ticks = ticks;
        }
        config.screenshot = self.screenshot.or(config.screenshot);
        config.save_path = self.save.or(config.save_path);
        config.load_path = self.load.or(config.load_path);
        config.event_log = self.event_log.or(config.event_log);
        config.input_script = self.input_script.or(config.input_script);

        let flags = [
            (self.god_mode, DebugToggles::GOD_MODE),
            (self.insta_mine, DebugToggles::INSTA_MINE),
            (self.no_clip, DebugToggles::NO_CLIP),
            (self.infinite_reach, DebugToggles::INFINITE_REACH),
        ];
        for (enabled, toggle) in flags {
            if enabled {
                config.debug.toggles.insert(toggle);
            }
        }
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = SessionConfig::load_from_path(&args.config);
    let config = args.apply(config);

    // RUST_LOG wins; otherwise the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting tileforge v{}", env!("CARGO_PKG_VERSION"));
    if config.debug.is_active() {
        info!(toggles = ?config.debug.toggles, "debug mode active");
    }

    let mut session = LoopbackSession::start(&config)?;
    let summary = session.run(config.ticks)?;

    if let Some(path) = &config.screenshot {
        session.screenshot(path)?;
    }
    if let Some(path) = &config.save_path {
        session.save(path)?;
    }

    println!(
        "ran {} frames: {}/{} joiners synced, {} host changes, worlds {}",
        summary.ticks,
        summary.joiners_synced,
        session.joiners().len(),
        summary.host_changes,
        if summary.converged { "converged" } else { "diverged" }
    );
    println!("host world {}", summary.host_fingerprint);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_file() {
        let args = Args::parse_from([
            "tileforge",
            "--seed",
            "77",
            "--joiners",
            "4",
            "--insta-mine",
            "--screenshot",
            "out/host.png",
        ]);
        let file = SessionConfig {
            seed: 1,
            ticks: 30,
            ..SessionConfig::default()
        };
        let config = args.apply(file);
        assert_eq!(config.seed, 77);
        assert_eq!(config.peers, 4);
        assert_eq!(config.ticks, 30);
        assert!(config.debug.insta_mine());
        assert!(!config.debug.god_mode());
        assert_eq!(config.screenshot, Some(PathBuf::from("out/host.png")));
    }

    #[test]
    fn file_toggles_survive_absent_flags() {
        let args = Args::parse_from(["tileforge"]);
        let mut file = SessionConfig::default();
        file.debug.toggles |= DebugToggles::NO_CLIP;
        let config = args.apply(file);
        assert!(config.debug.no_clip());
    }
}
