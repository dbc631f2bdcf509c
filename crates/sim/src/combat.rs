//! Contact damage and melee resolution.

use glam::Vec2;
use tileforge_core::{ToolMaterial, WearOutcome};
use tracing::debug;

use crate::config::SimConfig;
use crate::entity::Facing;
use crate::event::SimEvent;
use crate::state::SimulationState;

/// Frames a hostile ignores further hits after being struck.
pub const HIT_INVULNERABILITY: f32 = 10.0;

/// Upward component of every knockback impulse.
const KNOCKBACK_LIFT: f32 = 0.22;

/// Result of applying a hit to a hostile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// No hostile with that id.
    Missing,
    /// Damaged and still alive.
    Hit,
    /// Killed and removed.
    Killed,
}

/// Damage, knock back and mark a hostile invulnerable. Dead hostiles are removed.
pub fn apply_enemy_hit(state: &mut SimulationState, id: &str, damage: f32, knockback: Vec2) -> HitOutcome {
    let Some(enemy) = state.enemies.get_mut(id) else {
        return HitOutcome::Missing;
    };
    let died = enemy.damage(damage);
    enemy.apply_knockback(knockback);
    enemy.invulnerable = HIT_INVULNERABILITY;
    if died || !enemy.is_alive() {
        state.enemies.remove(id);
        debug!(id, "enemy killed");
        HitOutcome::Killed
    } else {
        HitOutcome::Hit
    }
}

/// Hurt the local player if a live hostile overlaps it.
///
/// Damage is reduced by the loadout's summed armor defense, never below 1.
pub fn resolve_contact_damage(state: &mut SimulationState, config: &SimConfig) -> Vec<SimEvent> {
    if state.debug.god_mode() {
        return Vec::new();
    }
    let defense = state.loadout.total_defense() as f32;
    let Some(player) = state.players.get_mut(&state.local_id) else {
        return Vec::new();
    };
    if !player.is_alive() || player.invulnerable > 0.0 {
        return Vec::new();
    }

    let player_box = player.body.aabb();
    let Some(attacker) = state
        .enemies
        .values()
        .find(|e| e.is_alive() && e.kind.is_hostile() && e.body.aabb().intersects(&player_box))
    else {
        return Vec::new();
    };

    let amount = (attacker.kind.contact_damage() - defense).max(1.0);
    let away = Facing::from_dx(player.pos().x - attacker.pos().x, attacker.facing).sign();
    let knockback = Vec2::new(away * attacker.kind.contact_knockback(), -KNOCKBACK_LIFT);
    let source = attacker.id.clone();

    player.apply_knockback(knockback);
    player.invulnerable = config.player_invulnerability;
    let died = player.damage(amount);
    debug!(%source, amount, health = player.health, "player took contact damage");

    let mut events = vec![SimEvent::PlayerDamaged { amount, source }];
    if died {
        events.push(SimEvent::PlayerDied);
        state.respawn_local();
        events.push(SimEvent::PlayerRespawned);
    }
    events
}

/// Swing a sword at `aim`; the first live hostile in id order within reach is hit.
pub fn melee_attack(
    state: &mut SimulationState,
    config: &SimConfig,
    aim: Vec2,
    material: ToolMaterial,
) -> Vec<SimEvent> {
    if state.actions.attack_cooldown > 0.0 {
        return Vec::new();
    }
    let Some(player) = state.local_player() else {
        return Vec::new();
    };
    let origin = player.pos();
    state.actions.attack_cooldown = config.attack_cooldown;

    let point = origin + (aim - origin).clamp_length_max(config.melee_reach);
    let Some((id, target)) = state.enemies.iter().find_map(|(id, e)| {
        let in_range = e.pos().distance(point) <= config.melee_radius + e.body.half.x;
        (e.is_alive() && e.kind.is_hostile() && e.invulnerable <= 0.0 && in_range)
            .then(|| (id.clone(), e.pos()))
    }) else {
        return Vec::new();
    };

    let damage = material.sword_damage();
    let dir = Facing::from_dx(target.x - origin.x, Facing::Right).sign();
    let knockback = Vec2::new(dir * material.sword_knockback(), -KNOCKBACK_LIFT);
    let mut events = vec![SimEvent::EnemyHit {
        id: id.clone(),
        damage,
        knockback,
    }];
    if apply_enemy_hit(state, &id, damage, knockback) == HitOutcome::Killed {
        events.push(SimEvent::EnemyKilled { id });
    }
    if state.loadout.wear_selected() == WearOutcome::Destroyed {
        events.push(SimEvent::ItemBroke);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use tileforge_core::{ArmorPiece, ArmorSlot, DebugToggles};
    use tileforge_world::{GenerationParams, TileWorld, WorldDimensions, WorldGenerator};

    fn state() -> SimulationState {
        let dims = WorldDimensions {
            width: 64,
            height: 110,
        };
        let world: TileWorld = WorldGenerator::with_params(3, dims, GenerationParams::default())
            .generate()
            .unwrap();
        SimulationState::new(world, "host", true)
    }

    fn zombie_on_player(state: &mut SimulationState) -> String {
        let pos = state.local_player().unwrap().pos();
        state.insert_enemy(EntityKind::Zombie, pos + Vec2::new(0.3, 0.0))
    }

    #[test]
    fn contact_damage_is_reduced_by_armor() {
        let mut state = state();
        state.loadout.equip(ArmorPiece {
            slot: ArmorSlot::Chestplate,
            defense: 5,
        });
        zombie_on_player(&mut state);
        let events = resolve_contact_damage(&mut state, &SimConfig::default());
        assert_eq!(
            events[0],
            SimEvent::PlayerDamaged {
                amount: 9.0,
                source: "enemy-1".into()
            }
        );
        let player = state.local_player().unwrap();
        assert_eq!(player.health, 91.0);
        assert_eq!(player.invulnerable, 40.0);
        assert!(player.body.vel.x < 0.0);
    }

    #[test]
    fn heavy_armor_still_deals_one_damage() {
        let mut state = state();
        state.loadout.equip(ArmorPiece {
            slot: ArmorSlot::Helmet,
            defense: 50,
        });
        zombie_on_player(&mut state);
        resolve_contact_damage(&mut state, &SimConfig::default());
        assert_eq!(state.local_player().unwrap().health, 99.0);
    }

    #[test]
    fn invulnerable_player_takes_nothing() {
        let mut state = state();
        zombie_on_player(&mut state);
        state.local_player_mut().unwrap().invulnerable = 5.0;
        assert!(resolve_contact_damage(&mut state, &SimConfig::default()).is_empty());

        state.local_player_mut().unwrap().invulnerable = 0.0;
        state.debug.toggles |= DebugToggles::GOD_MODE;
        assert!(resolve_contact_damage(&mut state, &SimConfig::default()).is_empty());
    }

    #[test]
    fn lethal_contact_respawns_player() {
        let mut state = state();
        zombie_on_player(&mut state);
        state.local_player_mut().unwrap().health = 3.0;
        let events = resolve_contact_damage(&mut state, &SimConfig::default());
        assert!(events.contains(&SimEvent::PlayerDied));
        assert!(events.contains(&SimEvent::PlayerRespawned));
        assert_eq!(state.local_player().unwrap().health, 100.0);
    }

    #[test]
    fn melee_hits_first_enemy_in_reach_and_wears_sword() {
        let mut state = state();
        state.loadout.select(1);
        let origin = state.local_player().unwrap().pos();
        let near = state.insert_enemy(EntityKind::Slime, origin + Vec2::new(1.5, 0.0));
        state.insert_enemy(EntityKind::Slime, origin + Vec2::new(1.6, 0.0));

        let events = melee_attack(&mut state, &SimConfig::default(), origin + Vec2::new(1.5, 0.0), ToolMaterial::Copper);
        assert!(matches!(&events[0], SimEvent::EnemyHit { id, damage, .. } if *id == near && *damage == 6.0));
        assert_eq!(state.enemies[&near].health, 19.0);
        assert_eq!(state.enemies[&near].invulnerable, HIT_INVULNERABILITY);
        assert_eq!(state.enemies["enemy-2"].health, 25.0);
        assert_eq!(state.loadout.selected_item().and_then(|s| s.durability), Some(119));

        // Cooldown blocks an immediate second swing.
        assert!(melee_attack(&mut state, &SimConfig::default(), origin, ToolMaterial::Copper).is_empty());
    }

    #[test]
    fn melee_aim_is_clamped_to_reach() {
        let mut state = state();
        let origin = state.local_player().unwrap().pos();
        let far = state.insert_enemy(EntityKind::Slime, origin + Vec2::new(10.0, 0.0));
        let events = melee_attack(&mut state, &SimConfig::default(), origin + Vec2::new(10.0, 0.0), ToolMaterial::Gold);
        assert!(events.is_empty());
        assert_eq!(state.enemies[&far].health, 25.0);
    }

    #[test]
    fn lethal_hit_removes_enemy() {
        let mut state = state();
        let id = state.insert_enemy(EntityKind::Slime, Vec2::new(5.0, 5.0));
        assert_eq!(apply_enemy_hit(&mut state, &id, 30.0, Vec2::ZERO), HitOutcome::Killed);
        assert!(state.enemies.is_empty());
        assert_eq!(apply_enemy_hit(&mut state, &id, 30.0, Vec2::ZERO), HitOutcome::Missing);
    }
}
