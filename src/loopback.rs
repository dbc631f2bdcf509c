//! Headless session: one host and N joiners wired through an in-process switchboard.

use anyhow::{Context, Result};
use std::path::Path;
use tileforge_net::{RoomListener, Role, SessionEvent, Switchboard};
use tileforge_peer::{FrameReport, Peer, PeerConfig};
use tileforge_render::write_png;
use tileforge_sim::InputSnapshot;
use tileforge_testkit::{world_fingerprint, EventRecord, JsonlSink};
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::save::{load_snapshot, save_snapshot};
use crate::scripted_input::ScriptedInputPlayer;

pub const HOST_ID: &str = "host";

const SETTLE_FRAMES: usize = 3;

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub joiners_synced: usize,
    pub converged: bool,
    pub host_fingerprint: String,
    pub host_changes: usize,
}

pub struct LoopbackSession {
    // keeps the room registered for the session's lifetime
    _board: Switchboard,
    _listener: RoomListener,
    host: Peer,
    joiners: Vec<Peer>,
    script: ScriptedInputPlayer,
    event_log: Option<JsonlSink>,
    frame_dt: f32,
}

impl LoopbackSession {
    /// Start the host (generated or resumed) and connect every joiner.
    pub fn start(config: &SessionConfig) -> Result<Self> {
        let board = Switchboard::new();
        let mut listener = board
            .open_room(&config.room)
            .with_context(|| format!("Failed to open room '{}'", config.room))?;

        let mut host = match &config.load_path {
            Some(path) => {
                let snapshot = load_snapshot(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                Peer::resume(HOST_ID, &snapshot, PeerConfig::default())?
            }
            None => Peer::from_seed(
                HOST_ID,
                Role::Host,
                config.seed,
                config.dimensions(),
                PeerConfig::default(),
            )
            .context("Host world generation failed")?,
        };
        host.state_mut().debug = config.debug;

        let mut joiners = Vec::with_capacity(config.peers);
        for n in 1..=config.peers {
            let id = format!("joiner-{n}");
            // placeholder world, replaced by the host's on INIT_SYNC
            let mut joiner = Peer::from_seed(
                id.clone(),
                Role::Joiner,
                config.seed.wrapping_add(n as u32),
                config.dimensions(),
                PeerConfig::headless(),
            )
            .with_context(|| format!("Joiner {id} world generation failed"))?;
            let channel = board
                .connect(&config.room, &id)
                .with_context(|| format!("Joiner {id} could not reach the host"))?;
            joiner.connect(HOST_ID, channel);
            let pending = listener
                .try_accept()
                .context("Host did not see the joiner's connection")?;
            host.connect(pending.peer_id, pending.channel);
            joiners.push(joiner);
        }

        let script = match &config.input_script {
            Some(path) => ScriptedInputPlayer::from_path(path)
                .with_context(|| format!("Failed to load input script {}", path.display()))?,
            None => ScriptedInputPlayer::wander(),
        };
        let event_log = config.event_log.as_ref().map(JsonlSink::create).transpose()?;

        info!(
            room = %config.room,
            seed = host.state().world.seed(),
            joiners = joiners.len(),
            "loopback session started"
        );
        Ok(Self {
            _board: board,
            _listener: listener,
            host,
            joiners,
            script,
            event_log,
            frame_dt: config.frame_dt,
        })
    }

    pub fn host(&self) -> &Peer {
        &self.host
    }

    pub fn joiners(&self) -> &[Peer] {
        &self.joiners
    }

    /// Run `ticks` scripted frames, then a few idle ones. Joiners step before
    /// the host each frame.
    #[instrument(skip(self), fields(joiners = self.joiners.len()))]
    pub fn run(&mut self, ticks: u64) -> Result<RunSummary> {
        let idle = InputSnapshot::idle();
        for _ in 0..ticks {
            for joiner in &mut self.joiners {
                let report = joiner.frame(&idle, self.frame_dt);
                log_report(self.event_log.as_mut(), joiner.local_id(), &report)?;
            }
            let at = self
                .host
                .state()
                .local_player()
                .map(|player| player.pos())
                .unwrap_or_default();
            let input = self.script.advance(self.frame_dt, at);
            let report = self.host.frame(&input, self.frame_dt);
            log_report(self.event_log.as_mut(), HOST_ID, &report)?;
        }
        self.settle()?;
        if let Some(log) = self.event_log.as_mut() {
            log.flush()?;
        }
        Ok(self.summary(ticks))
    }

    /// Idle frames so the last broadcasts reach every joiner.
    fn settle(&mut self) -> Result<()> {
        let idle = InputSnapshot::idle();
        for _ in 0..SETTLE_FRAMES {
            for joiner in &mut self.joiners {
                let report = joiner.frame(&idle, self.frame_dt);
                log_report(self.event_log.as_mut(), joiner.local_id(), &report)?;
            }
            let report = self.host.frame(&idle, self.frame_dt);
            log_report(self.event_log.as_mut(), HOST_ID, &report)?;
        }
        Ok(())
    }

    fn summary(&self, ticks: u64) -> RunSummary {
        let host_fingerprint = world_fingerprint(&self.host.state().world);
        let synced: Vec<&Peer> = self.joiners.iter().filter(|peer| peer.is_synced()).collect();
        let converged = synced.len() == self.joiners.len()
            && synced
                .iter()
                .all(|peer| world_fingerprint(&peer.state().world) == host_fingerprint);
        if !converged {
            warn!(synced = synced.len(), joiners = self.joiners.len(), "joiner worlds differ from the host");
        }
        RunSummary {
            ticks,
            joiners_synced: synced.len(),
            converged,
            host_fingerprint,
            host_changes: self.host.state().world.change_log().len(),
        }
    }

    /// Render the host's view around its player to a PNG.
    pub fn screenshot(&mut self, path: &Path) -> Result<()> {
        let view = self
            .host
            .follow_view()
            .context("Host has no render cache or no player to follow")?;
        let image = self
            .host
            .render(&view)
            .context("Host has no render cache")?;
        write_png(path, &image)?;
        info!(path = %path.display(), "screenshot written");
        Ok(())
    }

    /// Save the host's world.
    pub fn save(&self, path: &Path) -> Result<()> {
        save_snapshot(path, &self.host.snapshot())
    }
}

fn log_report(sink: Option<&mut JsonlSink>, peer: &str, report: &FrameReport) -> Result<()> {
    for event in &report.session_events {
        debug!(peer, ?event, "session event");
    }
    let Some(sink) = sink else {
        return Ok(());
    };
    for event in &report.events {
        sink.write(&EventRecord {
            tick: report.tick,
            peer,
            kind: event.kind(),
            payload: serde_json::to_value(event)?,
        })?;
    }
    for event in &report.session_events {
        sink.write(&EventRecord {
            tick: report.tick,
            peer,
            kind: session_kind(event),
            payload: serde_json::Value::String(format!("{event:?}")),
        })?;
    }
    Ok(())
}

fn session_kind(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::LinkOpened { .. } => "link_opened",
        SessionEvent::PeerJoined { .. } => "peer_joined",
        SessionEvent::PeerLeft { .. } => "peer_left",
        SessionEvent::HostLost => "host_lost",
        SessionEvent::Synced => "synced",
        SessionEvent::ConnectionFault { .. } => "connection_fault",
    }
}
