#![warn(missing_docs)]
//! Host-authoritative peer-to-peer sync for tileforge sessions.
//!
//! One peer hosts a room; joiners open a single data channel to it. Frames
//! are postcard-encoded [`NetMessage`]s wrapped in an [`Envelope`]. A
//! [`PeerSession`] tracks links and queues, a [`Broadcaster`] decides what
//! to send each frame, and a [`Reconciler`] applies what arrives.

mod codec;
mod error;
mod protocol;
mod reconcile;
mod session;
pub mod sync;
mod transport;

pub use codec::{decode_envelope, encode_envelope, FRAME_HEADER_LEN, MAX_FRAME_LEN};
pub use error::NetError;
pub use protocol::{
    compute_schema_hash, EnemySnapshot, Envelope, NetMessage, MAX_CHANGES, MAX_CHAT_LEN,
    MAX_ENEMIES, MAX_NAME_LEN, MAX_WORLD_SIDE, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
pub use reconcile::{Applied, ChatLine, ChatLog, Reconciler, CHAT_HISTORY};
pub use session::{ConnectionState, Inbound, PeerSession, Role, SessionEvent};
pub use sync::{BroadcastSchedule, Broadcaster, DueBroadcasts, SyncConfig};
pub use transport::{DataChannel, MemoryChannel, PendingLink, RoomListener, Switchboard};
