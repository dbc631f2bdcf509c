use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tileforge_core::DebugFlags;
use tileforge_world::WorldDimensions;
use tracing::warn;

pub const DEFAULT_SESSION_PATH: &str = "config/session.toml";

/// Session settings read from TOML; command-line flags override them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub seed: u32,
    pub world_width: usize,
    pub world_height: usize,
    /// Room the loopback host listens on.
    pub room: String,
    /// Simulated joiners connected to the host.
    pub peers: usize,
    /// Frames to run before exiting.
    pub ticks: u64,
    /// Frame length in 60 Hz units.
    pub frame_dt: f32,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub debug: DebugFlags,
    /// PNG of the host's view written after the run.
    pub screenshot: Option<PathBuf>,
    /// World snapshot written after the run.
    pub save_path: Option<PathBuf>,
    /// Snapshot the host resumes from instead of generating.
    pub load_path: Option<PathBuf>,
    /// JSON lines log of every peer's simulation events.
    pub event_log: Option<PathBuf>,
    /// Scripted input driving the host player; a built-in walk when unset.
    pub input_script: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let dims = WorldDimensions::default();
        Self {
            seed: 1337,
            world_width: dims.width,
            world_height: dims.height,
            room: "local".to_string(),
            peers: 1,
            ticks: 600,
            frame_dt: 1.0,
            log_level: "warn".to_string(),
            debug: DebugFlags::default(),
            screenshot: None,
            save_path: None,
            load_path: None,
            event_log: None,
            input_script: None,
        }
    }
}

impl SessionConfig {
    /// Load from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_SESSION_PATH))
    }

    /// Load from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<SessionConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    SessionConfig::default()
                }
            },
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("Session config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                SessionConfig::default()
            }
        }
    }

    /// Save to an explicit path.
    #[cfg(test)]
    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn dimensions(&self) -> WorldDimensions {
        WorldDimensions {
            width: self.world_width,
            height: self.world_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileforge_core::DebugToggles;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = SessionConfig::load_from_path(Path::new("does/not/exist.toml"));
        assert_eq!(cfg, SessionConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(
            &path,
            "seed = 9\npeers = 3\n\n[debug]\ntoggles = \"INSTA_MINE | INFINITE_REACH\"\ngravity_scale = 0.5\n",
        )
        .unwrap();
        let cfg = SessionConfig::load_from_path(&path);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.peers, 3);
        assert_eq!(cfg.ticks, SessionConfig::default().ticks);
        assert!(cfg.debug.toggles.contains(DebugToggles::INSTA_MINE));
        assert!(cfg.debug.toggles.contains(DebugToggles::INFINITE_REACH));
        assert_eq!(cfg.debug.gravity_scale, 0.5);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(&path, "seed = \"not a number\"").unwrap();
        assert_eq!(SessionConfig::load_from_path(&path), SessionConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session.toml");
        let cfg = SessionConfig {
            seed: 42,
            screenshot: Some(PathBuf::from("out/shot.png")),
            ..SessionConfig::default()
        };
        cfg.save_to_path(&path).unwrap();
        assert_eq!(SessionConfig::load_from_path(&path), cfg);
    }
}
