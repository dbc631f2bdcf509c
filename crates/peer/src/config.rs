use tileforge_physics::PhysicsConfig;
use tileforge_net::SyncConfig;
use tileforge_render::CacheConfig;
use tileforge_sim::SimConfig;
use tileforge_world::LightingConfig;

/// Tunables for every subsystem a [`crate::Peer`] drives.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Gameplay tunables.
    pub sim: SimConfig,
    /// Movement and collision tunables.
    pub physics: PhysicsConfig,
    /// Broadcast cadence and remote smoothing.
    pub sync: SyncConfig,
    /// Light attenuation and smoothing.
    pub lighting: LightingConfig,
    /// Chunk cache geometry; `None` runs without a render cache.
    pub cache: Option<CacheConfig>,
    /// Viewport size in pixels used to decide which chunks stay rendered.
    pub view_size: (u32, u32),
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            physics: PhysicsConfig::default(),
            sync: SyncConfig::default(),
            lighting: LightingConfig::default(),
            cache: Some(CacheConfig::default()),
            view_size: (640, 360),
        }
    }
}

impl PeerConfig {
    /// Same tunables without a render cache, for pure simulation runs.
    pub fn headless() -> Self {
        Self {
            cache: None,
            ..Self::default()
        }
    }
}
