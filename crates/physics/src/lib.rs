#![warn(missing_docs)]
//! Tile-grid physics: axis-separated AABB collision for entities.
//!
//! Coordinates are in tiles with y growing downward; tile `(tx, ty)` covers
//! `[tx, tx + 1) x [ty, ty + 1)`. `dt` is measured in 60 Hz frames.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tileforge_core::DebugFlags;
use tileforge_world::TileWorld;
use tracing::trace;

/// Shrink applied to AABBs before mapping them onto tiles, so a body resting
/// exactly on a tile boundary does not count as overlapping the next tile.
pub const COLLISION_EPSILON: f32 = 1e-3;

/// Horizontal speed below which a body counts as stopped.
const REST_SPEED: f32 = 1e-3;

/// Axis-aligned bounding box used for collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (left, top).
    pub min: Vec2,
    /// Maximum corner (right, bottom).
    pub max: Vec2,
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y);
        Self { min, max }
    }

    /// Box centred on `center` with the given half-extents.
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self::new(center - half, center + half)
    }

    /// Tests intersection with another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Inclusive range of tile columns the box overlaps.
    pub fn tile_columns(&self) -> (i32, i32) {
        (
            (self.min.x + COLLISION_EPSILON).floor() as i32,
            (self.max.x - COLLISION_EPSILON).floor() as i32,
        )
    }

    /// Inclusive range of tile rows the box overlaps.
    pub fn tile_rows(&self) -> (i32, i32) {
        (
            (self.min.y + COLLISION_EPSILON).floor() as i32,
            (self.max.y - COLLISION_EPSILON).floor() as i32,
        )
    }
}

/// Solid-tile queries used by collision.
pub trait CollisionGrid {
    /// Whether the tile stops movement.
    fn is_solid(&self, x: i32, y: i32) -> bool;
    /// Number of rows; bodies entirely below this have fallen out.
    fn rows(&self) -> usize;
}

impl CollisionGrid for TileWorld {
    /// Left and right of the grid are walls; above and below are open.
    fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || x as usize >= self.width() {
            return true;
        }
        self.block(x, y).is_some_and(|b| b.blocks_movement())
    }

    fn rows(&self) -> usize {
        self.height()
    }
}

/// A moving body: centre position, velocity, half-extents and contact state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Centre in tiles.
    pub pos: Vec2,
    /// Velocity in tiles per frame.
    pub vel: Vec2,
    /// Half width and half height.
    pub half: Vec2,
    /// Resting on a tile after the last step.
    pub grounded: bool,
    /// Horizontal motion was stopped by a tile during the last step.
    pub hit_wall: bool,
}

impl Body {
    /// Body at rest.
    pub fn new(pos: Vec2, half: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            half,
            grounded: false,
            hit_wall: false,
        }
    }

    /// Current bounds.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos, self.half)
    }

    /// Whether the body currently overlaps any solid tile.
    pub fn overlaps_solid(&self, grid: &impl CollisionGrid) -> bool {
        let aabb = self.aabb();
        let (x0, x1) = aabb.tile_columns();
        let (y0, y1) = aabb.tile_rows();
        (y0..=y1).any(|ty| (x0..=x1).any(|tx| grid.is_solid(tx, ty)))
    }
}

/// Movement intent for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveIntent {
    /// -1.0 (left) to 1.0 (right).
    pub horizontal: f32,
    /// -1.0 (up) to 1.0 (down); only honoured with no-clip.
    pub vertical: f32,
    /// Jump requested this tick.
    pub jump: bool,
}

/// Physics tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration per frame.
    pub gravity: f32,
    /// Terminal fall speed.
    pub max_fall: f32,
    /// Horizontal acceleration per frame at full intent.
    pub move_accel: f32,
    /// Horizontal speed multiplier per frame, applied after acceleration.
    pub friction: f32,
    /// Horizontal speed cap from intent.
    pub max_speed: f32,
    /// Upward speed of a jump.
    pub jump_speed: f32,
    /// Fraction of `jump_speed` used to climb one-tile ledges.
    pub step_factor: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.022,
            max_fall: 0.85,
            move_accel: 0.05,
            friction: 0.82,
            max_speed: 0.45,
            jump_speed: 0.42,
            step_factor: 0.6,
        }
    }
}

/// What happened to a body at the bottom of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFate {
    /// Still inside the world.
    InWorld,
    /// Fell past the last row; the owner should kill it.
    FellOut,
    /// Fell past the last row under god mode and was moved back to the top.
    Teleported,
}

/// Integrates bodies against a tile grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsEngine {
    config: PhysicsConfig,
}

impl PhysicsEngine {
    /// Engine with explicit tunables.
    pub fn new(config: PhysicsConfig) -> Self {
        Self { config }
    }

    /// Active tunables.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Advance one body by `dt` frames.
    ///
    /// Velocity is updated once, then position is integrated over
    /// `ceil(dt)` sub-steps with axis-separated collision.
    pub fn step(
        &self,
        body: &mut Body,
        intent: MoveIntent,
        grid: &impl CollisionGrid,
        dt: f32,
        debug: &DebugFlags,
    ) -> BodyFate {
        if dt <= 0.0 {
            return BodyFate::InWorld;
        }
        let cfg = &self.config;

        if debug.no_clip() {
            body.vel = Vec2::new(intent.horizontal, intent.vertical) * cfg.max_speed;
            body.pos += body.vel * dt;
            body.grounded = false;
            body.hit_wall = false;
            return BodyFate::InWorld;
        }

        let horizontal = intent.horizontal.clamp(-1.0, 1.0);
        body.vel.x = (body.vel.x + horizontal * cfg.move_accel * dt).clamp(-cfg.max_speed, cfg.max_speed);
        body.vel.x *= cfg.friction.powf(dt);
        if horizontal == 0.0 && body.vel.x.abs() < REST_SPEED {
            body.vel.x = 0.0;
        }

        if intent.jump && body.grounded {
            body.vel.y = -cfg.jump_speed;
        } else if self.should_step_up(body, grid) {
            body.vel.y = body.vel.y.min(-cfg.jump_speed * cfg.step_factor);
        }

        body.vel.y = (body.vel.y + cfg.gravity * debug.gravity_scale * dt).min(cfg.max_fall);

        let substeps = dt.ceil().max(1.0) as u32;
        let sub_dt = dt / substeps as f32;
        body.grounded = false;
        body.hit_wall = false;
        for _ in 0..substeps {
            self.substep(body, grid, sub_dt);
        }

        self.bottom_policy(body, grid, debug)
    }

    /// One collision sub-step: move on X and resolve, then on Y and resolve.
    pub fn substep(&self, body: &mut Body, grid: &impl CollisionGrid, dt: f32) {
        if body.vel.x != 0.0 {
            let before = body.pos.x;
            body.pos.x += body.vel.x * dt;
            let aabb = body.aabb();
            let (x0, x1) = aabb.tile_columns();
            let (y0, y1) = aabb.tile_rows();
            let hit = if body.vel.x > 0.0 {
                (x0..=x1).find(|&tx| (y0..=y1).any(|ty| grid.is_solid(tx, ty)))
            } else {
                (x0..=x1).rev().find(|&tx| (y0..=y1).any(|ty| grid.is_solid(tx, ty)))
            };
            if let Some(tx) = hit {
                // Never snap back past where the sub-step started.
                body.pos.x = if body.vel.x > 0.0 {
                    (tx as f32 - body.half.x).max(before)
                } else {
                    ((tx + 1) as f32 + body.half.x).min(before)
                };
                body.vel.x = 0.0;
                body.hit_wall = true;
            }
        }

        if body.vel.y != 0.0 {
            let before = body.pos.y;
            body.pos.y += body.vel.y * dt;
            let aabb = body.aabb();
            let (x0, x1) = aabb.tile_columns();
            let (y0, y1) = aabb.tile_rows();
            let hit = if body.vel.y > 0.0 {
                (y0..=y1).find(|&ty| (x0..=x1).any(|tx| grid.is_solid(tx, ty)))
            } else {
                (y0..=y1).rev().find(|&ty| (x0..=x1).any(|tx| grid.is_solid(tx, ty)))
            };
            if let Some(ty) = hit {
                if body.vel.y > 0.0 {
                    body.pos.y = (ty as f32 - body.half.y).max(before);
                    body.grounded = true;
                } else {
                    body.pos.y = ((ty + 1) as f32 + body.half.y).min(before);
                }
                body.vel.y = 0.0;
            }
        }
    }

    /// Grounded, moving, a one-tile ledge ahead and room above it.
    fn should_step_up(&self, body: &Body, grid: &impl CollisionGrid) -> bool {
        if !body.grounded || body.vel.x.abs() < REST_SPEED {
            return false;
        }
        let aabb = body.aabb();
        let ahead = if body.vel.x > 0.0 {
            (aabb.max.x + COLLISION_EPSILON).floor() as i32
        } else {
            (aabb.min.x - COLLISION_EPSILON).floor() as i32
        };
        let (head, foot) = aabb.tile_rows();
        grid.is_solid(ahead, foot)
            && (head - 1..foot).all(|ty| !grid.is_solid(ahead, ty))
    }

    fn bottom_policy(&self, body: &mut Body, grid: &impl CollisionGrid, debug: &DebugFlags) -> BodyFate {
        if body.aabb().min.y <= grid.rows() as f32 {
            return BodyFate::InWorld;
        }
        if debug.god_mode() {
            trace!(x = body.pos.x, "teleporting body back to the top");
            body.pos.y = body.half.y;
            body.vel = Vec2::ZERO;
            BodyFate::Teleported
        } else {
            BodyFate::FellOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Open grid with a solid floor at `floor_row` and optional extra tiles.
    struct TestGrid {
        width: i32,
        rows: usize,
        floor_row: i32,
        solids: Vec<(i32, i32)>,
    }

    impl CollisionGrid for TestGrid {
        fn is_solid(&self, x: i32, y: i32) -> bool {
            x < 0 || x >= self.width || y == self.floor_row || self.solids.contains(&(x, y))
        }
        fn rows(&self) -> usize {
            self.rows
        }
    }

    fn flat(floor_row: i32) -> TestGrid {
        TestGrid {
            width: 40,
            rows: 30,
            floor_row,
            solids: Vec::new(),
        }
    }

    fn player_on(floor_row: i32, x: f32) -> Body {
        let half = Vec2::new(0.4, 0.9);
        let mut body = Body::new(Vec2::new(x, floor_row as f32 - half.y), half);
        body.grounded = true;
        body
    }

    #[test]
    fn resting_body_stays_put() {
        let grid = flat(20);
        let engine = PhysicsEngine::default();
        let mut body = player_on(20, 10.5);
        let y = body.pos.y;
        engine.step(&mut body, MoveIntent::default(), &grid, 1.0, &DebugFlags::default());
        assert_eq!(body.vel.x, 0.0);
        assert_eq!(body.pos.y, y);
        assert!(body.grounded);
    }

    #[test]
    fn body_above_tile_lands_in_one_substep() {
        let grid = flat(20);
        let engine = PhysicsEngine::default();
        let mut body = player_on(20, 5.5);
        body.grounded = false;
        engine.step(&mut body, MoveIntent::default(), &grid, 1.0, &DebugFlags::default());
        assert!(body.grounded);
        assert_eq!(body.vel.y, 0.0);
    }

    #[test]
    fn walls_stop_horizontal_motion() {
        let mut grid = flat(20);
        grid.solids.extend([(12, 19), (12, 18), (12, 17)]);
        let engine = PhysicsEngine::default();
        let mut body = player_on(20, 11.3);
        body.vel.x = 0.45;
        engine.step(&mut body, MoveIntent { horizontal: 1.0, ..Default::default() }, &grid, 1.0, &DebugFlags::default());
        assert!(body.hit_wall);
        assert_eq!(body.vel.x, 0.0);
        assert!(body.aabb().max.x <= 12.0 + 1e-5);
    }

    #[test]
    fn auto_step_climbs_single_ledge() {
        let mut grid = flat(20);
        grid.solids.push((12, 19));
        let engine = PhysicsEngine::default();
        let mut body = player_on(20, 11.6);
        body.vel.x = 0.2;
        let intent = MoveIntent { horizontal: 1.0, ..Default::default() };
        engine.step(&mut body, intent, &grid, 1.0, &DebugFlags::default());
        assert!(body.vel.y < 0.0, "expected an upward impulse, got {}", body.vel.y);
        for _ in 0..60 {
            engine.step(&mut body, intent, &grid, 1.0, &DebugFlags::default());
        }
        assert!(body.pos.x > 13.0, "body stuck at {}", body.pos.x);
    }

    #[test]
    fn large_dt_is_split_into_substeps() {
        let grid = flat(20);
        let engine = PhysicsEngine::default();
        let mut body = player_on(20, 5.5);
        body.pos.y -= 3.0;
        body.grounded = false;
        body.vel.y = 0.85;
        engine.step(&mut body, MoveIntent::default(), &grid, 4.0, &DebugFlags::default());
        assert!(!body.overlaps_solid(&grid));
        assert!(body.grounded);
    }

    #[test]
    fn falling_out_kills_or_teleports() {
        let grid = TestGrid {
            width: 40,
            rows: 10,
            floor_row: 1000,
            solids: Vec::new(),
        };
        let engine = PhysicsEngine::default();
        let mut body = Body::new(Vec2::new(5.0, 11.5), Vec2::new(0.4, 0.9));
        let fate = engine.step(&mut body, MoveIntent::default(), &grid, 1.0, &DebugFlags::default());
        assert_eq!(fate, BodyFate::FellOut);

        let mut god = DebugFlags::default();
        god.toggles |= tileforge_core::DebugToggles::GOD_MODE;
        let fate = engine.step(&mut body, MoveIntent::default(), &grid, 1.0, &god);
        assert_eq!(fate, BodyFate::Teleported);
        assert_eq!(body.pos.y, 0.9);
    }

    #[test]
    fn no_clip_ignores_tiles() {
        let grid = flat(20);
        let engine = PhysicsEngine::default();
        let mut body = player_on(20, 5.5);
        let mut flags = DebugFlags::default();
        flags.toggles |= tileforge_core::DebugToggles::NO_CLIP;
        let intent = MoveIntent { vertical: 1.0, ..Default::default() };
        for _ in 0..10 {
            engine.step(&mut body, intent, &grid, 1.0, &flags);
        }
        assert!(body.overlaps_solid(&grid) || body.pos.y > 20.0);
    }

    #[test]
    fn friction_applies_while_walking() {
        let grid = flat(20);
        let engine = PhysicsEngine::default();
        let cfg = *engine.config();
        let mut body = player_on(20, 5.5);
        let intent = MoveIntent { horizontal: 1.0, ..Default::default() };
        engine.step(&mut body, intent, &grid, 1.0, &DebugFlags::default());
        assert!((body.vel.x - cfg.move_accel * cfg.friction).abs() < 1e-6);

        for _ in 0..40 {
            engine.step(&mut body, intent, &grid, 1.0, &DebugFlags::default());
        }
        // accelerate-then-decay settles at a * f / (1 - f)
        let terminal = cfg.move_accel * cfg.friction / (1.0 - cfg.friction);
        assert!((body.vel.x - terminal).abs() < 1e-3, "speed {}", body.vel.x);
    }
}

