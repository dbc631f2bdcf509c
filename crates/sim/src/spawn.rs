//! Host-side hostile spawning and despawning.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::config::SimConfig;
use crate::entity::{surface_spawn, EntityKind};
use crate::event::SimEvent;
use crate::state::SimulationState;

/// Count the spawn timer down and, when it fires, try to spawn one hostile
/// on the surface near the local player. Zombies come out at night, slimes
/// during the day. Hostiles far from every player are dropped first.
pub fn update_spawning(
    state: &mut SimulationState,
    config: &SimConfig,
    rng: &mut StdRng,
    dt: f32,
) -> Vec<SimEvent> {
    if !state.is_host {
        return Vec::new();
    }
    state.actions.spawn_timer -= dt;
    if state.actions.spawn_timer > 0.0 {
        return Vec::new();
    }
    state.actions.spawn_timer = config.spawn_interval;

    despawn_distant(state, config);
    if state.enemies.len() >= config.max_enemies {
        return Vec::new();
    }
    let Some(player) = state.local_player() else {
        return Vec::new();
    };

    let origin = player.pos().x.floor() as i32;
    let distance = rng.gen_range(config.spawn_min_distance..=config.spawn_max_distance);
    let side = if rng.gen_bool(0.5) { 1 } else { -1 };
    let max_x = state.world.width() as i32 - 2;
    let Some(x) = [origin + side * distance, origin - side * distance]
        .into_iter()
        .find(|x| (1..=max_x).contains(x))
    else {
        return Vec::new();
    };

    let kind = if state.clock.is_night() {
        EntityKind::Zombie
    } else {
        EntityKind::Slime
    };
    let pos = surface_spawn(&state.world, x, kind.half_extents());
    let id = state.insert_enemy(kind, pos);
    debug!(%id, kind = kind.as_str(), x, "spawned hostile");
    vec![SimEvent::EnemySpawned { id, kind }]
}

fn despawn_distant(state: &mut SimulationState, config: &SimConfig) {
    let players = state.player_positions();
    state.enemies.retain(|id, enemy| {
        let keep = players
            .iter()
            .any(|p| p.distance(enemy.pos()) <= config.despawn_distance);
        if !keep {
            debug!(%id, "despawning distant hostile");
        }
        keep
    });
}
