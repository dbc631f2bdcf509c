#![warn(missing_docs)]
//! Per-peer frame driver.
//!
//! A [`Peer`] owns everything one participant of a session mutates: the
//! simulation state, its network session, the lighting engine and an optional
//! chunk image cache. Each call to [`Peer::frame`] applies inbound traffic,
//! ticks the simulation, relights what changed and queues outbound messages,
//! in that order and on the caller's thread.

mod config;
mod driver;
mod error;

pub use config::PeerConfig;
pub use driver::{FrameReport, Peer};
pub use error::PeerError;
