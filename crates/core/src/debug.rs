//! Debug-mode switches threaded explicitly through physics and simulation.
//!
//! Every toggle is off by default; with [`DebugFlags::default`] the gameplay
//! contracts (durability, reach, damage, collision) hold unmodified.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Boolean debug toggles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DebugToggles: u8 {
        /// Skip tile collision and gravity for the local player.
        const NO_CLIP = 0b0000_0001;
        /// Ignore damage and teleport back to the top instead of dying.
        const GOD_MODE = 0b0000_0010;
        /// Break any breakable block in a single tick without wearing tools.
        const INSTA_MINE = 0b0000_0100;
        /// Remove the interaction reach limit.
        const INFINITE_REACH = 0b0000_1000;
    }
}

/// Debug configuration for one peer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugFlags {
    /// Enabled toggles.
    pub toggles: DebugToggles,
    /// Multiplier applied to gravity.
    pub gravity_scale: f32,
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self {
            toggles: DebugToggles::empty(),
            gravity_scale: 1.0,
        }
    }
}

impl DebugFlags {
    /// Whether collision and gravity are bypassed.
    #[inline]
    pub fn no_clip(&self) -> bool {
        self.toggles.contains(DebugToggles::NO_CLIP)
    }

    /// Whether the player is invulnerable.
    #[inline]
    pub fn god_mode(&self) -> bool {
        self.toggles.contains(DebugToggles::GOD_MODE)
    }

    /// Whether blocks break instantly.
    #[inline]
    pub fn insta_mine(&self) -> bool {
        self.toggles.contains(DebugToggles::INSTA_MINE)
    }

    /// Whether reach limits are ignored.
    #[inline]
    pub fn infinite_reach(&self) -> bool {
        self.toggles.contains(DebugToggles::INFINITE_REACH)
    }

    /// Returns true when any toggle is active or gravity is scaled.
    pub fn is_active(&self) -> bool {
        !self.toggles.is_empty() || (self.gravity_scale - 1.0).abs() > f32::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_are_inactive() {
        let flags = DebugFlags::default();
        assert!(!flags.is_active());
        assert!(!flags.no_clip());
        assert!(!flags.god_mode());
    }

    #[test]
    fn toggles_roundtrip_through_json() {
        let flags = DebugFlags {
            toggles: DebugToggles::GOD_MODE | DebugToggles::INSTA_MINE,
            gravity_scale: 0.5,
        };
        let text = serde_json::to_string(&flags).unwrap();
        let parsed: DebugFlags = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, flags);
        assert!(parsed.god_mode() && parsed.insta_mine());
        assert!(!parsed.infinite_reach());
    }
}
