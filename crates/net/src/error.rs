//! Connection and codec faults.

use thiserror::Error;
use tileforge_world::WorldGenError;

/// Errors raised by the sync layer.
#[derive(Debug, Error)]
pub enum NetError {
    /// No peer answered at the requested room.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),
    /// The data channel was closed by either side.
    #[error("data channel closed")]
    ChannelClosed,
    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// A frame could not be encoded, decoded or verified.
    #[error("codec error: {0}")]
    Codec(String),
    /// INIT_SYNC named a world that cannot be regenerated.
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] WorldGenError),
}

impl NetError {
    /// Whether the session can keep running (and the user may retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NetError::PeerUnreachable(_) | NetError::Transport(_) | NetError::Codec(_)
        )
    }

    /// Short user-visible description.
    pub fn user_message(&self) -> String {
        match self {
            NetError::PeerUnreachable(room) => {
                format!("Could not reach a host for room '{room}'. Check the room id and retry.")
            }
            NetError::ChannelClosed => "The connection was closed.".to_string(),
            NetError::Transport(_) | NetError::Codec(_) => format!("Connection problem: {self}"),
            NetError::Bootstrap(_) => format!("Could not join the session: {self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(NetError::PeerUnreachable("abc".into()).is_recoverable());
        assert!(NetError::Transport("reset".into()).is_recoverable());
        assert!(!NetError::ChannelClosed.is_recoverable());
        assert!(NetError::PeerUnreachable("abc".into())
            .user_message()
            .contains("abc"));
    }
}
