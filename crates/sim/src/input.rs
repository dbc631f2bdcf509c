//! Device-agnostic per-tick input.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tileforge_physics::MoveIntent;

/// What the local participant wants to do this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// -1.0 (left) to 1.0 (right).
    pub move_x: f32,
    /// -1.0 (up) to 1.0 (down); only used with no-clip.
    pub move_y: f32,
    /// Jump held.
    pub jump: bool,
    /// Aim target in tile coordinates.
    pub aim: Vec2,
    /// Primary action (mine / attack) held.
    pub primary: bool,
    /// Secondary action (place) held.
    pub secondary: bool,
    /// Hotbar slot selected this tick.
    pub select_slot: Option<usize>,
}

impl InputSnapshot {
    /// No movement, no actions.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Movement part of the snapshot.
    pub fn intent(&self) -> MoveIntent {
        MoveIntent {
            horizontal: self.move_x.clamp(-1.0, 1.0),
            vertical: self.move_y.clamp(-1.0, 1.0),
            jump: self.jump,
        }
    }

    /// Aim target as a tile coordinate.
    pub fn aim_tile(&self) -> (i32, i32) {
        (self.aim.x.floor() as i32, self.aim.y.floor() as i32)
    }
}
