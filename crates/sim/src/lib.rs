#![warn(missing_docs)]
//! Entity simulation: players, hostiles and the guide.
//!
//! The tick driver owns a [`SimulationState`] and threads it explicitly
//! through each phase. Per-kind decisions live in the [`behavior`] table so
//! the driver itself never branches on entity kind.

pub mod behavior;
pub mod combat;
mod config;
mod entity;
mod event;
mod input;
pub mod interact;
pub mod spawn;
mod state;
mod tick;

pub use behavior::{behavior_for, Behavior, BehaviorContext, Effects};
pub use combat::{apply_enemy_hit, HitOutcome, HIT_INVULNERABILITY};
pub use config::SimConfig;
pub use entity::{surface_spawn, AiState, AiTag, Entity, EntityKind, Facing};
pub use event::SimEvent;
pub use input::InputSnapshot;
pub use state::{ActionState, MiningProgress, SimulationState, GUIDE_ID};
pub use tick::Simulation;
