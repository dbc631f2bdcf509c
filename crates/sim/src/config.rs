//! Simulation tunables.

use serde::{Deserialize, Serialize};

/// Gameplay constants for AI, combat, interaction and spawning.
///
/// Distances are in tiles and durations in 60 Hz frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Hostiles chase players within this distance.
    pub aggro_radius: f32,
    /// The guide flees hostiles within this distance.
    pub flee_radius: f32,
    /// Mining and placement reach.
    pub reach: f32,
    /// Maximum distance from the player to a melee aim point.
    pub melee_reach: f32,
    /// Hit radius around the aim point (the target's half width is added).
    pub melee_radius: f32,
    /// Frames between melee swings.
    pub attack_cooldown: f32,
    /// Frames between placements.
    pub place_cooldown: f32,
    /// Invulnerability granted to the player after contact damage.
    pub player_invulnerability: f32,
    /// Mining progress per frame without a pickaxe.
    pub hand_mining_power: f32,
    /// Frames between host spawn attempts.
    pub spawn_interval: f32,
    /// Maximum live hostiles.
    pub max_enemies: usize,
    /// Minimum horizontal spawn distance from the local player.
    pub spawn_min_distance: i32,
    /// Maximum horizontal spawn distance from the local player.
    pub spawn_max_distance: i32,
    /// Hostiles farther than this from every player are removed.
    pub despawn_distance: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            aggro_radius: 24.0,
            flee_radius: 8.0,
            reach: 6.0,
            melee_reach: 2.5,
            melee_radius: 1.0,
            attack_cooldown: 20.0,
            place_cooldown: 8.0,
            player_invulnerability: 40.0,
            hand_mining_power: 0.5,
            spawn_interval: 240.0,
            max_enemies: 6,
            spawn_min_distance: 16,
            spawn_max_distance: 30,
            despawn_distance: 96.0,
        }
    }
}
