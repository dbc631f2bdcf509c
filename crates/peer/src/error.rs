use thiserror::Error;
use tileforge_net::NetError;
use tileforge_world::{WorldError, WorldGenError};

/// Errors raised while starting or driving a peer.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The starting world could not be generated.
    #[error("world generation failed: {0}")]
    WorldGen(#[from] WorldGenError),
    /// A saved world could not be decoded.
    #[error("world restore failed: {0}")]
    World(#[from] WorldError),
    /// A local request was rejected by the sync layer.
    #[error(transparent)]
    Net(#[from] NetError),
}
