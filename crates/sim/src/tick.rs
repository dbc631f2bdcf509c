//! Kind-agnostic tick driver.

use tileforge_core::{domain_hash, scoped_rng, DebugFlags, ItemKind};
use tileforge_physics::{BodyFate, PhysicsConfig, PhysicsEngine};
use tracing::{debug, trace};

use crate::behavior::{behavior_for, BehaviorContext};
use crate::combat::{melee_attack, resolve_contact_damage};
use crate::config::SimConfig;
use crate::entity::{Entity, Facing};
use crate::event::SimEvent;
use crate::input::InputSnapshot;
use crate::interact::{mine, place};
use crate::spawn::update_spawning;
use crate::state::SimulationState;

/// Advances a [`SimulationState`]: input, AI, combat, spawning, then physics.
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    config: SimConfig,
    physics: PhysicsEngine,
}

impl Simulation {
    /// Simulation with explicit tunables.
    pub fn new(config: SimConfig, physics: PhysicsConfig) -> Self {
        Self {
            config,
            physics: PhysicsEngine::new(physics),
        }
    }

    /// Gameplay tunables.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Physics engine used by [`Simulation::step_physics`].
    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    /// Run one simulation tick of `dt` frames. Physics runs separately.
    ///
    /// Only the host advances hostile AI and spawns; every peer simulates
    /// its own NPCs and resolves contact damage against its own player.
    pub fn tick(&self, state: &mut SimulationState, input: &InputSnapshot, dt: f32) -> Vec<SimEvent> {
        if dt <= 0.0 {
            return Vec::new();
        }
        state.tick = state.tick.advance(1);
        let mut rng = scoped_rng(
            u64::from(state.world.seed()),
            domain_hash(&state.local_id),
            state.tick,
        );

        let mut events = self.apply_input(state, input, dt);
        self.run_ai(state, &mut rng, dt);
        events.extend(resolve_contact_damage(state, &self.config));
        events.extend(update_spawning(state, &self.config, &mut rng, dt));
        tick_timers(state, dt);
        state.clock.advance(dt);

        trace!(tick = state.tick.0, events = events.len(), "simulation tick");
        events
    }

    /// Integrate the local player, NPCs and (on the host) hostiles.
    ///
    /// Remote players are positioned by the network layer, and joiners leave
    /// hostiles where the last snapshot put them.
    pub fn step_physics(&self, state: &mut SimulationState, dt: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let world = &state.world;

        let mut local_fell = false;
        if let Some(player) = state.players.get_mut(&state.local_id) {
            let fate = self.physics.step(&mut player.body, player.intent, world, dt, &state.debug);
            local_fell = fate == BodyFate::FellOut;
        }

        let ambient = DebugFlags::default();
        let mut fallen = Vec::new();
        if state.is_host {
            for enemy in state.enemies.values_mut() {
                if self.physics.step(&mut enemy.body, enemy.intent, world, dt, &ambient) == BodyFate::FellOut {
                    fallen.push(enemy.id.clone());
                }
            }
        }

        let spawn_x = state.spawn_x;
        for npc in state.npcs.values_mut() {
            if self.physics.step(&mut npc.body, npc.intent, world, dt, &ambient) == BodyFate::FellOut {
                let home = Entity::on_surface(npc.id.clone(), npc.kind, world, spawn_x);
                debug!(id = %npc.id, "npc fell out of the world, returning home");
                npc.body = home.body;
            }
        }

        for id in fallen {
            state.enemies.remove(&id);
            events.push(SimEvent::EnemyKilled { id });
        }
        if local_fell {
            debug!(id = %state.local_id, "player fell out of the world");
            events.push(SimEvent::PlayerDied);
            state.respawn_local();
            events.push(SimEvent::PlayerRespawned);
        }
        events
    }

    fn apply_input(&self, state: &mut SimulationState, input: &InputSnapshot, dt: f32) -> Vec<SimEvent> {
        if let Some(slot) = input.select_slot {
            state.loadout.select(slot);
        }
        let held = state.loadout.selected_item().map(|stack| stack.kind);
        let Some(player) = state.players.get_mut(&state.local_id) else {
            return Vec::new();
        };
        player.intent = input.intent();
        player.held_item = held;
        let dx = if input.primary || input.secondary {
            input.aim.x - player.pos().x
        } else {
            input.move_x
        };
        player.facing = Facing::from_dx(dx, player.facing);

        let mut events = Vec::new();
        let (x, y) = input.aim_tile();
        if input.primary {
            match held {
                Some(ItemKind::Sword(material)) => {
                    events.extend(melee_attack(state, &self.config, input.aim, material));
                }
                _ => events.extend(mine(state, &self.config, x, y, dt)),
            }
        } else {
            state.actions.mining = None;
        }
        if input.secondary {
            events.extend(place(state, &self.config, x, y));
        }
        events
    }

    fn run_ai(&self, state: &mut SimulationState, rng: &mut rand::rngs::StdRng, dt: f32) {
        let targets = state.player_positions();
        let threats = state.hostile_positions();
        let ctx = BehaviorContext {
            targets: &targets,
            threats: &threats,
            config: &self.config,
        };

        let advance = |entity: &mut Entity, rng: &mut rand::rngs::StdRng| {
            let effects = behavior_for(entity.kind).advance(entity, &ctx, rng, dt);
            entity.intent = effects.intent;
            entity.facing = Facing::from_dx(effects.intent.horizontal, entity.facing);
            if let Some(tag) = effects.retagged {
                trace!(id = %entity.id, ?tag, "ai state changed");
            }
        };

        for npc in state.npcs.values_mut() {
            advance(npc, rng);
        }
        if state.is_host {
            for enemy in state.enemies.values_mut() {
                advance(enemy, rng);
            }
        }
    }
}

fn tick_timers(state: &mut SimulationState, dt: f32) {
    let local_id = state.local_id.as_str();
    for player in state.players.values_mut() {
        if player.id == local_id {
            player.tick_timers(dt);
        } else {
            player.invulnerable = (player.invulnerable - dt).max(0.0);
        }
    }
    for npc in state.npcs.values_mut() {
        npc.tick_timers(dt);
    }
    for enemy in state.enemies.values_mut() {
        if state.is_host {
            enemy.tick_timers(dt);
        } else {
            enemy.invulnerable = (enemy.invulnerable - dt).max(0.0);
        }
    }
    state.actions.attack_cooldown = (state.actions.attack_cooldown - dt).max(0.0);
    state.actions.place_cooldown = (state.actions.place_cooldown - dt).max(0.0);
}
