//! Entities: players, hostiles and the guide.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tileforge_core::ItemKind;
use tileforge_physics::{Body, MoveIntent};
use tileforge_world::TileWorld;

/// Discriminates entity behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// A participant; input- or network-driven.
    Player,
    /// Hopping hostile, daytime spawner.
    Slime,
    /// Walking hostile, night-time spawner.
    Zombie,
    /// Friendly NPC.
    Guide,
}

impl EntityKind {
    /// Canonical lowercase key for logs and configs.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Slime => "slime",
            EntityKind::Zombie => "zombie",
            EntityKind::Guide => "guide",
        }
    }

    /// Whether the kind attacks players.
    pub fn is_hostile(self) -> bool {
        matches!(self, EntityKind::Slime | EntityKind::Zombie)
    }

    /// Half width and half height in tiles.
    pub fn half_extents(self) -> Vec2 {
        match self {
            EntityKind::Slime => Vec2::new(0.45, 0.35),
            _ => Vec2::new(0.4, 0.9),
        }
    }

    /// Starting health.
    pub fn max_health(self) -> f32 {
        match self {
            EntityKind::Player => 100.0,
            EntityKind::Slime => 25.0,
            EntityKind::Zombie => 45.0,
            EntityKind::Guide => 250.0,
        }
    }

    /// Fraction of the full movement intent the kind walks with.
    pub fn speed(self) -> f32 {
        match self {
            EntityKind::Player => 1.0,
            EntityKind::Slime => 0.6,
            EntityKind::Zombie => 0.5,
            EntityKind::Guide => 0.4,
        }
    }

    /// Damage dealt on touching a player (before armor).
    pub fn contact_damage(self) -> f32 {
        match self {
            EntityKind::Slime => 8.0,
            EntityKind::Zombie => 14.0,
            EntityKind::Player | EntityKind::Guide => 0.0,
        }
    }

    /// Horizontal knockback applied to a player on contact.
    pub fn contact_knockback(self) -> f32 {
        match self {
            EntityKind::Slime => 0.3,
            EntityKind::Zombie => 0.4,
            EntityKind::Player | EntityKind::Guide => 0.0,
        }
    }
}

/// Horizontal facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    /// Toward negative x.
    Left,
    /// Toward positive x.
    #[default]
    Right,
}

impl Facing {
    /// -1.0 or 1.0.
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    /// Facing matching the sign of `dx`; `current` when `dx` is zero.
    pub fn from_dx(dx: f32, current: Facing) -> Facing {
        if dx > 0.0 {
            Facing::Right
        } else if dx < 0.0 {
            Facing::Left
        } else {
            current
        }
    }
}

/// AI behaviour tag for non-player kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiTag {
    /// Standing still.
    #[default]
    Idle,
    /// Wandering in `AiState::dir`.
    Walk,
    /// Running away from a hostile.
    Flee,
    /// Pursuing a player.
    Chase,
}

/// Transient AI state: behaviour tag plus countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiState {
    /// Current behaviour.
    pub tag: AiTag,
    /// Frames until the behaviour is re-evaluated.
    pub timer: f32,
    /// Preferred horizontal direction (-1, 0 or 1).
    pub dir: f32,
}

/// A simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Map key.
    pub id: String,
    /// Behaviour discriminant.
    pub kind: EntityKind,
    /// Physics state.
    pub body: Body,
    /// Current health.
    pub health: f32,
    /// Health cap.
    pub max_health: f32,
    /// Horizontal facing.
    pub facing: Facing,
    /// Frames of remaining invulnerability.
    pub invulnerable: f32,
    /// AI state (unused for players).
    pub ai: AiState,
    /// Movement intent consumed by the physics phase.
    pub intent: MoveIntent,
    /// Item shown in hand (players only).
    pub held_item: Option<ItemKind>,
    /// Free-running animation clock.
    pub anim_timer: f32,
}

impl Entity {
    /// New entity of `kind` centred at `pos`.
    pub fn new(id: impl Into<String>, kind: EntityKind, pos: Vec2) -> Self {
        let max_health = kind.max_health();
        Self {
            id: id.into(),
            kind,
            body: Body::new(pos, kind.half_extents()),
            health: max_health,
            max_health,
            facing: Facing::default(),
            invulnerable: 0.0,
            ai: AiState::default(),
            intent: MoveIntent::default(),
            held_item: None,
            anim_timer: 0.0,
        }
    }

    /// New entity standing on the surface of column `x`.
    pub fn on_surface(id: impl Into<String>, kind: EntityKind, world: &TileWorld, x: i32) -> Self {
        let pos = surface_spawn(world, x, kind.half_extents());
        Self::new(id, kind, pos)
    }

    /// Centre position.
    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.body.pos
    }

    /// Alive and not yet removed.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Subtract health. Returns true when this killed the entity.
    pub fn damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health -= amount;
        self.health <= 0.0
    }

    /// Overwrite velocity with a knockback impulse.
    pub fn apply_knockback(&mut self, impulse: Vec2) {
        self.body.vel = impulse;
        self.body.grounded = false;
    }

    /// Count down timers by `dt` frames.
    pub fn tick_timers(&mut self, dt: f32) {
        self.invulnerable = (self.invulnerable - dt).max(0.0);
        self.ai.timer -= dt;
        self.anim_timer += dt;
    }
}

/// Centre position for a body of `half` standing on the first solid row of column `x`.
pub fn surface_spawn(world: &TileWorld, x: i32, half: Vec2) -> Vec2 {
    let x = x.clamp(0, world.width().saturating_sub(1) as i32);
    let ground = world.surface_row(x).unwrap_or(world.height()) as f32;
    Vec2::new(x as f32 + 0.5, (ground - half.y).max(half.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_reports_death_once() {
        let mut slime = Entity::new("enemy-1", EntityKind::Slime, Vec2::ZERO);
        assert!(!slime.damage(10.0));
        assert!(slime.damage(20.0));
        assert!(!slime.is_alive());
        assert!(!slime.damage(5.0));
    }

    #[test]
    fn timers_floor_at_zero() {
        let mut guide = Entity::new("guide", EntityKind::Guide, Vec2::ZERO);
        guide.invulnerable = 1.5;
        guide.tick_timers(1.0);
        guide.tick_timers(1.0);
        assert_eq!(guide.invulnerable, 0.0);
        assert_eq!(guide.anim_timer, 2.0);
    }

    #[test]
    fn facing_follows_motion() {
        assert_eq!(Facing::from_dx(-0.3, Facing::Right), Facing::Left);
        assert_eq!(Facing::from_dx(0.0, Facing::Left), Facing::Left);
        assert!(EntityKind::Zombie.is_hostile());
        assert!(!EntityKind::Guide.is_hostile());
    }
}
