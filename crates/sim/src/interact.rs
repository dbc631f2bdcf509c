//! Mining and placement by the local player.

use glam::Vec2;
use tileforge_core::{ItemKind, WearOutcome};
use tileforge_physics::Aabb;
use tileforge_world::{BlockId, WallId};
use tracing::trace;

use crate::config::SimConfig;
use crate::event::SimEvent;
use crate::state::{MiningProgress, SimulationState};

/// Whether tile `(x, y)` is within interaction reach of the local player.
pub fn within_reach(state: &SimulationState, config: &SimConfig, x: i32, y: i32) -> bool {
    if state.debug.infinite_reach() {
        return true;
    }
    let Some(player) = state.local_player() else {
        return false;
    };
    let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
    player.pos().distance(center) <= config.reach
}

/// Advance mining of `(x, y)` by `dt` frames.
///
/// Progress resets when the target changes. The block breaks once progress
/// reaches its hardness; its drop goes to the loadout and a held pickaxe
/// wears by one.
pub fn mine(state: &mut SimulationState, config: &SimConfig, x: i32, y: i32, dt: f32) -> Vec<SimEvent> {
    let hardness = state.world.block(x, y).and_then(BlockId::hardness);
    let Some(hardness) = hardness.filter(|_| within_reach(state, config, x, y)) else {
        state.actions.mining = None;
        return Vec::new();
    };

    let pickaxe = match state.loadout.selected_item().map(|stack| stack.kind) {
        Some(ItemKind::Pickaxe(material)) => Some(material),
        _ => None,
    };
    let insta = state.debug.insta_mine();
    let power = pickaxe.map_or(config.hand_mining_power, |m| m.mining_power());

    let progress = match state.actions.mining {
        Some(current) if current.x == x && current.y == y => current.progress + power * dt,
        _ => power * dt,
    };
    if !insta && progress < hardness {
        state.actions.mining = Some(MiningProgress { x, y, progress });
        return Vec::new();
    }

    state.actions.mining = None;
    let Some(mined) = state.world.block(x, y) else {
        return Vec::new();
    };
    if !state.world.set_block(x, y, BlockId::Air) {
        return Vec::new();
    }
    trace!(x, y, block = ?mined, "block mined");

    let mut events = vec![SimEvent::BlockChanged {
        x,
        y,
        block: BlockId::Air,
    }];
    if let Some(drop) = mined.drop() {
        state.loadout.add(ItemKind::Block(drop.to_u8()), 1);
    }
    if pickaxe.is_some() && !insta && state.loadout.wear_selected() == WearOutcome::Destroyed {
        events.push(SimEvent::ItemBroke);
    }
    events
}

/// Place the selected block or wall at `(x, y)`.
///
/// Blocks need an empty cell outside the boundary band that no entity
/// overlaps; walls need a cell without a wall.
pub fn place(state: &mut SimulationState, config: &SimConfig, x: i32, y: i32) -> Vec<SimEvent> {
    if state.actions.place_cooldown > 0.0 || !within_reach(state, config, x, y) {
        return Vec::new();
    }
    let Some(kind) = state.loadout.selected_item().map(|stack| stack.kind) else {
        return Vec::new();
    };

    let event = match kind {
        ItemKind::Block(raw) => {
            let Some(block) = BlockId::from_u8(raw).filter(|b| *b != BlockId::Air) else {
                return Vec::new();
            };
            if state.world.block(x, y) != Some(BlockId::Air)
                || state.world.is_boundary_row(y)
                || (block.blocks_movement() && tile_occupied(state, x, y))
            {
                return Vec::new();
            }
            state.world.set_block(x, y, block);
            SimEvent::BlockChanged { x, y, block }
        }
        ItemKind::Wall(raw) => {
            let Some(wall) = WallId::from_u8(raw).filter(|w| w.is_present()) else {
                return Vec::new();
            };
            if state.world.wall(x, y) != Some(WallId::None) {
                return Vec::new();
            }
            state.world.set_wall(x, y, wall);
            SimEvent::WallChanged { x, y, wall }
        }
        _ => return Vec::new(),
    };

    state.loadout.take_one_selected();
    state.actions.place_cooldown = config.place_cooldown;
    vec![event]
}

fn tile_occupied(state: &SimulationState, x: i32, y: i32) -> bool {
    let tile = Aabb::new(
        Vec2::new(x as f32, y as f32),
        Vec2::new(x as f32 + 1.0, y as f32 + 1.0),
    );
    state
        .players
        .values()
        .chain(state.enemies.values())
        .chain(state.npcs.values())
        .any(|e| e.body.aabb().intersects(&tile))
}
