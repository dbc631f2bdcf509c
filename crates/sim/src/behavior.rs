//! Per-kind AI behaviour table.
//!
//! The tick driver never matches on [`EntityKind`] itself: it looks up the
//! kind's [`Behavior`], calls `advance`, and feeds the returned intent to the
//! physics phase.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use tileforge_physics::MoveIntent;

use crate::config::SimConfig;
use crate::entity::{AiTag, Entity, EntityKind};

/// Read-only view of the surroundings handed to a behaviour.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext<'a> {
    /// Positions of live players.
    pub targets: &'a [Vec2],
    /// Positions of live hostiles.
    pub threats: &'a [Vec2],
    /// Tunables.
    pub config: &'a SimConfig,
}

/// Result of advancing one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Effects {
    /// Movement for the physics phase.
    pub intent: MoveIntent,
    /// New AI tag when the behaviour switched state this tick.
    pub retagged: Option<AiTag>,
}

/// Decision logic for one entity kind.
pub trait Behavior: Sync {
    /// Update AI state and produce this tick's movement.
    fn advance(
        &self,
        entity: &mut Entity,
        ctx: &BehaviorContext<'_>,
        rng: &mut StdRng,
        dt: f32,
    ) -> Effects;
}

/// Players are driven by input or the network.
pub struct PlayerBehavior;
/// Hops toward nearby players.
pub struct SlimeBehavior;
/// Walks toward nearby players, wanders otherwise.
pub struct ZombieBehavior;
/// Idles and wanders; flees hostiles.
pub struct GuideBehavior;

static PLAYER: PlayerBehavior = PlayerBehavior;
static SLIME: SlimeBehavior = SlimeBehavior;
static ZOMBIE: ZombieBehavior = ZombieBehavior;
static GUIDE: GuideBehavior = GuideBehavior;

/// Behaviour table lookup.
pub fn behavior_for(kind: EntityKind) -> &'static dyn Behavior {
    match kind {
        EntityKind::Player => &PLAYER,
        EntityKind::Slime => &SLIME,
        EntityKind::Zombie => &ZOMBIE,
        EntityKind::Guide => &GUIDE,
    }
}

/// Closest point to `from` within `radius`.
pub fn nearest_within(from: Vec2, points: &[Vec2], radius: f32) -> Option<Vec2> {
    points
        .iter()
        .copied()
        .filter(|p| p.distance_squared(from) <= radius * radius)
        .min_by(|a, b| a.distance_squared(from).total_cmp(&b.distance_squared(from)))
}

fn sign_toward(from: f32, to: f32, dead_zone: f32) -> f32 {
    let dx = to - from;
    if dx.abs() < dead_zone {
        0.0
    } else {
        dx.signum()
    }
}

/// Pick idle or walk with `idle_weight` percent chance of idle.
fn reroll_wander(entity: &mut Entity, rng: &mut StdRng, idle_weight: u32) -> AiTag {
    let tag = if rng.gen_range(0..100) < idle_weight {
        AiTag::Idle
    } else {
        AiTag::Walk
    };
    entity.ai.tag = tag;
    entity.ai.timer = rng.gen_range(90.0..240.0);
    entity.ai.dir = if tag == AiTag::Walk {
        if rng.gen_bool(0.5) {
            1.0
        } else {
            -1.0
        }
    } else {
        0.0
    };
    tag
}

impl Behavior for PlayerBehavior {
    fn advance(&self, entity: &mut Entity, _: &BehaviorContext<'_>, _: &mut StdRng, _: f32) -> Effects {
        Effects {
            intent: entity.intent,
            retagged: None,
        }
    }
}

impl Behavior for SlimeBehavior {
    fn advance(
        &self,
        entity: &mut Entity,
        ctx: &BehaviorContext<'_>,
        rng: &mut StdRng,
        _dt: f32,
    ) -> Effects {
        let speed = entity.kind.speed();
        let pos = entity.pos();
        if !entity.body.grounded {
            return Effects {
                intent: MoveIntent {
                    horizontal: entity.ai.dir * speed,
                    ..MoveIntent::default()
                },
                retagged: None,
            };
        }
        if entity.ai.timer > 0.0 {
            return Effects::default();
        }

        let target = nearest_within(pos, ctx.targets, ctx.config.aggro_radius);
        let (tag, dir) = match target {
            Some(t) => (AiTag::Chase, sign_toward(pos.x, t.x, 0.1)),
            None => (AiTag::Walk, if rng.gen_bool(0.5) { 1.0 } else { -1.0 }),
        };
        let retagged = (entity.ai.tag != tag).then_some(tag);
        entity.ai.tag = tag;
        entity.ai.dir = dir;
        entity.ai.timer = rng.gen_range(50.0..90.0);
        Effects {
            intent: MoveIntent {
                horizontal: dir * speed,
                vertical: 0.0,
                jump: true,
            },
            retagged,
        }
    }
}

impl Behavior for ZombieBehavior {
    fn advance(
        &self,
        entity: &mut Entity,
        ctx: &BehaviorContext<'_>,
        rng: &mut StdRng,
        _dt: f32,
    ) -> Effects {
        let pos = entity.pos();
        let before = entity.ai.tag;
        match nearest_within(pos, ctx.targets, ctx.config.aggro_radius) {
            Some(target) => {
                entity.ai.tag = AiTag::Chase;
                entity.ai.dir = sign_toward(pos.x, target.x, 0.3);
            }
            None if entity.ai.tag == AiTag::Chase || entity.ai.timer <= 0.0 => {
                reroll_wander(entity, rng, 50);
            }
            None => {}
        }
        let jump = entity.body.grounded && entity.body.hit_wall && entity.ai.dir != 0.0;
        Effects {
            intent: MoveIntent {
                horizontal: entity.ai.dir * entity.kind.speed(),
                vertical: 0.0,
                jump,
            },
            retagged: (entity.ai.tag != before).then_some(entity.ai.tag),
        }
    }
}

impl Behavior for GuideBehavior {
    fn advance(
        &self,
        entity: &mut Entity,
        ctx: &BehaviorContext<'_>,
        rng: &mut StdRng,
        _dt: f32,
    ) -> Effects {
        let pos = entity.pos();
        let before = entity.ai.tag;
        if let Some(threat) = nearest_within(pos, ctx.threats, ctx.config.flee_radius) {
            let away = -sign_toward(pos.x, threat.x, 0.0);
            entity.ai.tag = AiTag::Flee;
            entity.ai.dir = if away == 0.0 { -entity.facing.sign() } else { away };
            entity.ai.timer = 30.0;
        } else if entity.ai.timer <= 0.0 {
            reroll_wander(entity, rng, 60);
        }

        let speed = entity.kind.speed();
        let horizontal = match entity.ai.tag {
            AiTag::Idle => 0.0,
            AiTag::Flee => (entity.ai.dir * speed * 1.5).clamp(-1.0, 1.0),
            AiTag::Walk | AiTag::Chase => entity.ai.dir * speed,
        };
        let jump = entity.body.grounded && entity.body.hit_wall && horizontal != 0.0;
        Effects {
            intent: MoveIntent {
                horizontal,
                vertical: 0.0,
                jump,
            },
            retagged: (entity.ai.tag != before).then_some(entity.ai.tag),
        }
    }
}
