//! Data-channel abstraction and the in-memory transport.
//!
//! A [`DataChannel`] is a reliable, ordered, message-oriented pipe between
//! two peers (one frame per message). [`MemoryChannel`] implements it over
//! tokio unbounded queues; [`Switchboard`] plays the signalling role, letting
//! a host open a room and joiners connect to it by id.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::error::NetError;

/// Reliable ordered message pipe to one remote peer.
pub trait DataChannel {
    /// Whether both directions can still carry messages.
    fn is_open(&self) -> bool;
    /// Queue one frame for delivery.
    fn send(&mut self, frame: Vec<u8>) -> Result<(), NetError>;
    /// Next delivered frame; `Ok(None)` when nothing is pending.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, NetError>;
    /// Close both directions.
    fn close(&mut self);
}

/// In-process data channel backed by tokio unbounded queues.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: Option<UnboundedSender<Vec<u8>>>,
    rx: UnboundedReceiver<Vec<u8>>,
}

impl MemoryChannel {
    /// Two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = unbounded_channel();
        let (b_tx, a_rx) = unbounded_channel();
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }
}

impl DataChannel for MemoryChannel {
    fn is_open(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn send(&mut self, frame: Vec<u8>) -> Result<(), NetError> {
        let tx = self.tx.as_ref().ok_or(NetError::ChannelClosed)?;
        tx.send(frame).map_err(|_| NetError::ChannelClosed)
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, NetError> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(NetError::ChannelClosed),
        }
    }

    fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }
}

/// A connection waiting to be accepted by a room's host.
#[derive(Debug)]
pub struct PendingLink {
    /// Id the joiner announced.
    pub peer_id: String,
    /// Host end of the channel.
    pub channel: MemoryChannel,
}

/// Host-side handle for an open room.
#[derive(Debug)]
pub struct RoomListener {
    room: String,
    incoming: UnboundedReceiver<PendingLink>,
}

impl RoomListener {
    /// Room id joiners connect with.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Next pending connection, if any.
    pub fn try_accept(&mut self) -> Option<PendingLink> {
        self.incoming.try_recv().ok()
    }
}

/// In-process signalling: maps room ids to listening hosts.
#[derive(Debug, Clone, Default)]
pub struct Switchboard {
    rooms: Arc<Mutex<BTreeMap<String, UnboundedSender<PendingLink>>>>,
}

impl Switchboard {
    /// Empty switchboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `room` for incoming joiners.
    pub fn open_room(&self, room: &str) -> Result<RoomListener, NetError> {
        let mut rooms = self
            .rooms
            .lock()
            .map_err(|_| NetError::Transport("switchboard lock poisoned".into()))?;
        if rooms.get(room).is_some_and(|tx| !tx.is_closed()) {
            return Err(NetError::Transport(format!("room '{room}' is already hosted")));
        }
        let (tx, incoming) = unbounded_channel();
        rooms.insert(room.to_string(), tx);
        info!(room, "room opened");
        Ok(RoomListener {
            room: room.to_string(),
            incoming,
        })
    }

    /// Connect `peer_id` to the host of `room`, returning the joiner end.
    pub fn connect(&self, room: &str, peer_id: &str) -> Result<MemoryChannel, NetError> {
        let rooms = self
            .rooms
            .lock()
            .map_err(|_| NetError::Transport("switchboard lock poisoned".into()))?;
        let host = rooms
            .get(room)
            .ok_or_else(|| NetError::PeerUnreachable(room.to_string()))?;
        let (local, remote) = MemoryChannel::pair();
        host.send(PendingLink {
            peer_id: peer_id.to_string(),
            channel: remote,
        })
        .map_err(|_| NetError::PeerUnreachable(room.to_string()))?;
        debug!(room, peer_id, "connected to room");
        Ok(local)
    }
}
