use std::ops::RangeInclusive;

use image::RgbaImage;
use tileforge_core::SimTick;
use tileforge_net::{
    sync, Applied, Broadcaster, ChatLine, ChatLog, DataChannel, MemoryChannel, NetError, NetMessage,
    PeerSession, Reconciler, Role, SessionEvent, MAX_CHAT_LEN,
};
use tileforge_sim::{InputSnapshot, SimEvent, Simulation, SimulationState};
use tileforge_world::{
    GenerationParams, LightingEngine, TileWorld, WorldDimensions, WorldGenerator, WorldSnapshot,
};
use tileforge_render::{compose_frame, ChunkRenderCache, FlatColorArtist, Viewport};
use tracing::{debug, info, instrument, warn};

use crate::config::PeerConfig;
use crate::error::PeerError;

/// What happened during one [`Peer::frame`].
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Tick counter after the frame.
    pub tick: SimTick,
    /// Local simulation events, in the order they were raised.
    pub events: Vec<SimEvent>,
    /// Connection lifecycle changes observed this frame.
    pub session_events: Vec<SessionEvent>,
    /// Inbound messages applied.
    pub applied: usize,
    /// Frames handed to data channels.
    pub sent: usize,
    /// Columns whose light was recomputed.
    pub relit: Option<RangeInclusive<usize>>,
    /// Chunk images re-rendered.
    pub chunks_rendered: usize,
}

/// One participant of a session: host or joiner.
pub struct Peer<C: DataChannel = MemoryChannel> {
    state: SimulationState,
    session: PeerSession<C>,
    simulation: Simulation,
    lighting: LightingEngine,
    broadcaster: Broadcaster,
    reconciler: Reconciler,
    cache: Option<ChunkRenderCache>,
    config: PeerConfig,
    artist: FlatColorArtist,
}

impl<C: DataChannel> Peer<C> {
    /// Peer starting from an existing world.
    ///
    /// A joiner's world is a placeholder until the host's INIT_SYNC replaces it.
    pub fn new(local_id: impl Into<String>, role: Role, mut world: TileWorld, config: PeerConfig) -> Self {
        let local_id = local_id.into();
        let lighting = LightingEngine::new(config.lighting);
        lighting.recompute_all(&mut world);
        world.take_dirty();
        let cache = config
            .cache
            .map(|cache| ChunkRenderCache::new(cache, world.width(), world.height()));
        let session = match role {
            Role::Host => PeerSession::host(local_id.clone()),
            Role::Joiner => PeerSession::joiner(local_id.clone()),
        };
        info!(
            peer = %local_id,
            ?role,
            seed = world.seed(),
            width = world.width(),
            height = world.height(),
            "peer started"
        );
        Self {
            state: SimulationState::new(world, local_id, role == Role::Host),
            session,
            simulation: Simulation::new(config.sim.clone(), config.physics),
            lighting,
            broadcaster: Broadcaster::new(config.sync.clone()),
            reconciler: Reconciler::new(config.sync.clone()),
            cache,
            config,
            artist: FlatColorArtist,
        }
    }

    /// Peer on a freshly generated world.
    pub fn from_seed(
        local_id: impl Into<String>,
        role: Role,
        seed: u32,
        dims: WorldDimensions,
        config: PeerConfig,
    ) -> Result<Self, PeerError> {
        let world = WorldGenerator::with_params(seed, dims, GenerationParams::default()).generate()?;
        Ok(Self::new(local_id, role, world, config))
    }

    /// Host resuming a saved world.
    ///
    /// The clock and the local player's record are restored; other saved
    /// players rejoin through the session like anyone else. The change log is
    /// rebuilt against a fresh world from the saved seed so joiners can
    /// reproduce the loaded edits.
    pub fn resume(
        local_id: impl Into<String>,
        snapshot: &WorldSnapshot,
        config: PeerConfig,
    ) -> Result<Self, PeerError> {
        let mut world = snapshot.restore_world()?;
        let dims = WorldDimensions {
            width: snapshot.width,
            height: snapshot.height,
        };
        let generated =
            WorldGenerator::with_params(snapshot.seed, dims, GenerationParams::default()).generate()?;
        let recorded = world.rebuild_change_log(&generated)?;
        debug!(seed = snapshot.seed, recorded, "rebuilt change log for resumed world");
        let mut peer = Self::new(local_id, Role::Host, world, config);
        peer.state.clock.sync(snapshot.time);
        let local = peer.state.local_id.clone();
        if let Some(record) = snapshot.players.iter().find(|record| record.id == local) {
            peer.state.restore_local(record);
        }
        Ok(peer)
    }

    /// Attach a data channel to `remote_id`.
    pub fn connect(&mut self, remote_id: impl Into<String>, channel: C) {
        self.session.add_link(remote_id, channel);
    }

    /// Local entity id.
    pub fn local_id(&self) -> &str {
        &self.state.local_id
    }

    /// Whether this peer is the authority for hostiles and time.
    pub fn is_host(&self) -> bool {
        self.session.is_host()
    }

    /// Whether the peer has the host's world (always true on the host).
    pub fn is_synced(&self) -> bool {
        self.session.is_synced()
    }

    /// Simulation state.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Mutable simulation state, e.g. to toggle debug flags.
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// Network session.
    pub fn session(&self) -> &PeerSession<C> {
        &self.session
    }

    /// Chat history.
    pub fn chat(&self) -> &ChatLog {
        self.reconciler.chat()
    }

    /// Chunk cache, when rendering is enabled.
    pub fn cache(&self) -> Option<&ChunkRenderCache> {
        self.cache.as_ref()
    }

    /// Tunables in use.
    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Queue a chat line for every connected peer and log it locally.
    pub fn say(&mut self, text: &str, color: u32) -> Result<(), PeerError> {
        if text.chars().count() > MAX_CHAT_LEN {
            return Err(NetError::Codec(format!("chat text exceeds {MAX_CHAT_LEN} characters")).into());
        }
        let author = self.state.local_id.clone();
        self.reconciler.record_local_chat(ChatLine {
            author: author.clone(),
            text: text.to_string(),
            color,
        });
        self.session.broadcast(NetMessage::Chat {
            text: text.to_string(),
            author,
            color,
        });
        Ok(())
    }

    /// Plain-data copy of the world and players for the persistence collaborator.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.state.world, self.state.clock.time, self.state.player_records())
    }

    /// Advance one frame of `dt` 60 Hz units.
    ///
    /// Inbound traffic is applied first, then the simulation and physics
    /// tick, then lighting and the chunk cache catch up with any tile
    /// mutations, and finally outbound messages are flushed.
    #[instrument(skip(self, input), fields(peer = %self.state.local_id, tick = self.state.tick.0))]
    pub fn frame(&mut self, input: &InputSnapshot, dt: f32) -> FrameReport {
        let mut report = FrameReport {
            applied: self.apply_inbound(),
            ..FrameReport::default()
        };
        report.session_events = self.handle_session_events();

        // a joiner has nothing to simulate until the host's world arrives
        if self.session.is_synced() {
            report.events = self.simulation.tick(&mut self.state, input, dt);
            report.events.extend(self.simulation.step_physics(&mut self.state, dt));
        }
        self.reconciler.interpolate(&mut self.state, dt);

        report.relit = self.relight();
        report.chunks_rendered = self.refresh_cache();

        if self.session.is_synced() {
            for message in self.broadcaster.collect(&self.state, &report.events, dt) {
                self.session.broadcast(message);
            }
        }
        report.sent = self.session.flush();
        report.tick = self.state.tick;
        report
    }

    fn apply_inbound(&mut self) -> usize {
        let mut applied = 0;
        let mut init_requests = Vec::new();
        for inbound in self.session.receive() {
            if !self.session.is_synced() && !matches!(inbound.envelope.message, NetMessage::InitSync { .. }) {
                debug!(from = %inbound.link, kind = inbound.envelope.message.kind(), "ignored before sync");
                continue;
            }
            match self.reconciler.apply(&mut self.state, &inbound) {
                Ok(Applied::Ignored) => {}
                Ok(Applied::InitRequested { link }) => {
                    applied += 1;
                    init_requests.push(link);
                }
                Ok(Applied::Bootstrapped { replayed }) => {
                    applied += 1;
                    self.finish_bootstrap(replayed);
                }
                Ok(_) => applied += 1,
                Err(err) => {
                    warn!(from = %inbound.link, error = %err, "inbound message rejected");
                    self.session.report_fault(&inbound.link, &err);
                }
            }
        }
        // answered after the whole batch so the bootstrap includes it
        for link in init_requests {
            self.session.send_to(&link, sync::init_sync(&self.state));
            self.session.mark_synced(&link);
        }
        applied
    }

    fn finish_bootstrap(&mut self, replayed: usize) {
        self.session.complete_bootstrap();
        self.lighting.recompute_all(&mut self.state.world);
        self.state.world.take_dirty();
        let (width, height) = (self.state.world.width(), self.state.world.height());
        if let Some(cache) = self.cache.as_mut() {
            *cache = ChunkRenderCache::new(*cache.config(), width, height);
        }
        info!(replayed, width, height, "joined host world");
    }

    fn handle_session_events(&mut self) -> Vec<SessionEvent> {
        let events = self.session.drain_events();
        for event in &events {
            match event {
                SessionEvent::PeerLeft { peer } => self.reconciler.forget_peer(&mut self.state, peer),
                SessionEvent::HostLost => {
                    warn!("host connection lost; continuing alone");
                    self.reconciler.forget_all_remote(&mut self.state);
                }
                SessionEvent::ConnectionFault {
                    peer,
                    message,
                    recoverable,
                } => warn!(peer = %peer, recoverable, "{message}"),
                SessionEvent::LinkOpened { .. } | SessionEvent::PeerJoined { .. } | SessionEvent::Synced => {
                    debug!(?event, "session event");
                }
            }
        }
        events
    }

    fn relight(&mut self) -> Option<RangeInclusive<usize>> {
        let dirty = self.state.world.take_dirty();
        let (min_x, max_x) = dirty.columns?;
        let relit = self.lighting.recompute(&mut self.state.world, min_x, max_x, true);
        if let Some(cache) = self.cache.as_mut() {
            cache.apply_dirty(&dirty);
            if let Some(range) = &relit {
                cache.mark_dirty_range(*range.start(), *range.end());
            }
        }
        relit
    }

    fn refresh_cache(&mut self) -> usize {
        let view = self.follow_view();
        match (self.cache.as_mut(), view) {
            (Some(cache), Some(view)) => cache.update(&self.state.world, &view, &self.artist).rendered,
            _ => 0,
        }
    }

    /// Viewport centred on the local player, sized by [`PeerConfig::view_size`].
    pub fn follow_view(&self) -> Option<Viewport> {
        let cache = self.cache.as_ref()?;
        let player = self.state.local_player()?;
        let (width, height) = self.config.view_size;
        Some(Viewport::centered_on(player.pos(), width, height, cache.config().tile_px))
    }

    /// Compose a frame for `view`, rendering any chunk it needs first.
    ///
    /// `None` when the peer runs without a render cache.
    pub fn render(&mut self, view: &Viewport) -> Option<RgbaImage> {
        let cache = self.cache.as_mut()?;
        cache.update(&self.state.world, view, &self.artist);
        Some(compose_frame(&self.state, cache, view, &self.artist))
    }

    /// Close every link.
    pub fn disconnect(&mut self) {
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileforge_net::Switchboard;
    use tileforge_world::BlockId;

    fn dims() -> WorldDimensions {
        WorldDimensions {
            width: 96,
            height: 100,
        }
    }

    fn connected_pair() -> (Peer, Peer) {
        let board = Switchboard::new();
        let mut listener = board.open_room("room").unwrap();
        let mut host: Peer = Peer::from_seed("host", Role::Host, 21, dims(), PeerConfig::headless()).unwrap();
        let mut joiner: Peer = Peer::from_seed("joiner", Role::Joiner, 99, dims(), PeerConfig::headless()).unwrap();
        joiner.connect("host", board.connect("room", "joiner").unwrap());
        let pending = listener.try_accept().unwrap();
        host.connect(pending.peer_id, pending.channel);
        (host, joiner)
    }

    fn run(host: &mut Peer, joiner: &mut Peer, frames: usize) {
        let idle = InputSnapshot::idle();
        for _ in 0..frames {
            joiner.frame(&idle, 1.0);
            host.frame(&idle, 1.0);
        }
    }

    #[test]
    fn host_starts_synced_and_lit() {
        let host: Peer = Peer::from_seed("host", Role::Host, 5, dims(), PeerConfig::default()).unwrap();
        assert!(host.is_synced());
        assert!(host.is_host());
        assert!((host.state().world.light(10, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn joiner_does_not_simulate_before_sync() {
        let mut joiner: Peer =
            Peer::from_seed("joiner", Role::Joiner, 5, dims(), PeerConfig::headless()).unwrap();
        let report = joiner.frame(&InputSnapshot::idle(), 1.0);
        assert!(!joiner.is_synced());
        assert_eq!(report.tick, SimTick::ZERO);
        assert!(report.events.is_empty());
    }

    #[test]
    fn joiner_adopts_host_world() {
        let (mut host, mut joiner) = connected_pair();
        let y = host.state().world.surface_row(30).unwrap() as i32;
        host.state_mut().world.set_block(30, y, BlockId::Air);
        run(&mut host, &mut joiner, 6);
        assert!(joiner.is_synced());
        assert_eq!(joiner.state().world.seed(), 21);
        assert_eq!(joiner.state().world.block(30, y), Some(BlockId::Air));
        assert!(joiner.state().players.contains_key("host"));
    }

    #[test]
    fn local_mutations_relight_their_columns() {
        let mut host: Peer = Peer::from_seed("host", Role::Host, 5, dims(), PeerConfig::default()).unwrap();
        host.state_mut().world.set_block(40, 20, BlockId::Stone);
        let report = host.frame(&InputSnapshot::idle(), 1.0);
        let relit = report.relit.expect("columns relit");
        assert!(relit.contains(&40));
        assert!(report.chunks_rendered > 0);
    }

    #[test]
    fn chat_is_logged_and_delivered() {
        let (mut host, mut joiner) = connected_pair();
        run(&mut host, &mut joiner, 4);
        host.say("welcome", 0xffcc00).unwrap();
        run(&mut host, &mut joiner, 2);
        assert_eq!(host.chat().len(), 1);
        let line = joiner.chat().lines().last().expect("chat line");
        assert_eq!(line.text, "welcome");
        assert_eq!(line.author, "host");
    }

    #[test]
    fn overlong_chat_is_refused() {
        let mut host: Peer = Peer::from_seed("host", Role::Host, 5, dims(), PeerConfig::headless()).unwrap();
        let err = host.say(&"x".repeat(MAX_CHAT_LEN + 1), 0).unwrap_err();
        assert!(matches!(err, PeerError::Net(NetError::Codec(_))));
        assert!(host.chat().is_empty());
    }

    #[test]
    fn resume_restores_clock_and_player() {
        let mut host: Peer = Peer::from_seed("host", Role::Host, 8, dims(), PeerConfig::headless()).unwrap();
        host.state_mut().world.set_block(12, 12, BlockId::Brick);
        host.state_mut().clock.sync(5000.0);
        let snapshot = host.snapshot();

        let resumed: Peer = Peer::resume("host", &snapshot, PeerConfig::headless()).unwrap();
        assert_eq!(resumed.state().world.block(12, 12), Some(BlockId::Brick));
        assert_eq!(resumed.state().clock.time, 5000.0);
        let before = host.state().local_player().unwrap().pos();
        let after = resumed.state().local_player().unwrap().pos();
        assert!((before - after).length() < 1e-4);
    }

    #[test]
    fn render_composes_requested_view() {
        let mut host: Peer = Peer::from_seed("host", Role::Host, 5, dims(), PeerConfig::default()).unwrap();
        let view = host.follow_view().expect("view");
        let image = host.render(&view).expect("image");
        assert_eq!(image.dimensions(), (640, 360));
    }
}
