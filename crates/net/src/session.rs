//! Per-peer connection bookkeeping with explicit inbound and outbound queues.
//!
//! A [`PeerSession`] never calls back into the simulation. The tick driver
//! drains [`PeerSession::receive`] once per frame, applies the messages, queues
//! replies and broadcasts, then calls [`PeerSession::flush`].
//!
//! Connection state machine, per link:
//!
//! ```text
//! Connecting -> Open -> (joiner sends REQUEST_INIT) AwaitingInit -> Synced -> Closed
//! ```
//!
//! On the host a link goes `Open -> Synced` once its INIT_SYNC is queued.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::codec::{decode_envelope, encode_envelope};
use crate::error::NetError;
use crate::protocol::{compute_schema_hash, Envelope, NetMessage};
use crate::transport::{DataChannel, MemoryChannel};

/// Which side of the star topology this peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the room; authoritative for time and hostiles.
    Host,
    /// Connected to a host by room id.
    Joiner,
}

/// Lifecycle of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Channel handed over but not yet usable.
    Connecting,
    /// Channel usable, no handshake yet.
    Open,
    /// Joiner sent REQUEST_INIT and waits for INIT_SYNC.
    AwaitingInit,
    /// Ongoing traffic flows in both directions.
    Synced,
    /// Either side closed the channel.
    Closed,
}

/// Something the tick driver should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A channel to `peer` became usable.
    LinkOpened {
        /// Remote id.
        peer: String,
    },
    /// Host: `peer` received its bootstrap and now gets broadcasts.
    PeerJoined {
        /// Remote id.
        peer: String,
    },
    /// Host: `peer` disconnected; a PEER_LEFT notice is broadcast to the rest.
    PeerLeft {
        /// Remote id.
        peer: String,
    },
    /// Joiner: the host link closed. Hostiles and time stop advancing.
    HostLost,
    /// Joiner: INIT_SYNC was applied.
    Synced,
    /// A transport or codec problem worth showing the user.
    ConnectionFault {
        /// Remote id, or the room id while connecting.
        peer: String,
        /// User-visible text.
        message: String,
        /// Whether the session keeps running.
        recoverable: bool,
    },
}

/// One decoded inbound message and the link it arrived on.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// Link the frame was read from (the host id on joiners).
    pub link: String,
    /// Decoded, verified envelope. `sender_id` may differ from `link` for relayed traffic.
    pub envelope: Envelope,
}

struct Link<C> {
    channel: C,
    state: ConnectionState,
}

/// Connection set plus message queues for one peer.
pub struct PeerSession<C: DataChannel = MemoryChannel> {
    local_id: String,
    role: Role,
    schema: u64,
    links: BTreeMap<String, Link<C>>,
    direct: Vec<(String, NetMessage)>,
    outbound: Vec<NetMessage>,
    events: Vec<SessionEvent>,
    synced: bool,
    bootstrap_pending: bool,
}

impl<C: DataChannel> PeerSession<C> {
    /// Session for the peer that owns the room.
    pub fn host(local_id: impl Into<String>) -> Self {
        Self::new(local_id.into(), Role::Host)
    }

    /// Session for a peer joining someone else's room.
    pub fn joiner(local_id: impl Into<String>) -> Self {
        Self::new(local_id.into(), Role::Joiner)
    }

    fn new(local_id: String, role: Role) -> Self {
        Self {
            local_id,
            role,
            schema: compute_schema_hash(),
            links: BTreeMap::new(),
            direct: Vec::new(),
            outbound: Vec::new(),
            events: Vec::new(),
            synced: role == Role::Host,
            bootstrap_pending: false,
        }
    }

    /// Local peer id, stamped on every outbound envelope.
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Host or joiner.
    pub fn role(&self) -> Role {
        self.role
    }

    /// True on the host.
    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    /// Whether this peer may process ongoing traffic. Hosts always are.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Current state of a link, if it exists.
    pub fn link_state(&self, peer: &str) -> Option<ConnectionState> {
        self.links.get(peer).map(|link| link.state)
    }

    /// Ids of every tracked link.
    pub fn link_ids(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    /// Number of links that receive broadcasts.
    pub fn synced_links(&self) -> usize {
        self.links
            .values()
            .filter(|link| link.state == ConnectionState::Synced)
            .count()
    }

    /// Adopt a freshly connected channel to `peer`.
    pub fn add_link(&mut self, peer: impl Into<String>, channel: C) {
        let peer = peer.into();
        if self.role == Role::Joiner && !self.links.is_empty() {
            warn!(%peer, "joiners keep a single link; ignoring extra channel");
            return;
        }
        debug!(%peer, role = ?self.role, "link added");
        self.links.insert(
            peer,
            Link {
                channel,
                state: ConnectionState::Connecting,
            },
        );
    }

    /// Record a fault raised outside the session (for example while dialing).
    pub fn report_fault(&mut self, peer: &str, err: &NetError) {
        warn!(%peer, error = %err, "connection fault");
        self.events.push(SessionEvent::ConnectionFault {
            peer: peer.to_string(),
            message: err.user_message(),
            recoverable: err.is_recoverable(),
        });
    }

    /// Advance handshakes and drain every link's pending frames.
    ///
    /// Own loopback traffic is dropped. A joiner ignores everything except
    /// INIT_SYNC until it is synced; frames that follow an INIT_SYNC in the
    /// same batch are kept and must be applied after it. The host relays
    /// ongoing traffic from one joiner to every other synced link, keeping the
    /// original sender id.
    pub fn receive(&mut self) -> Vec<Inbound> {
        self.advance_handshakes();

        let mut inbound = Vec::new();
        let mut relays: Vec<(String, Vec<u8>)> = Vec::new();
        let ids: Vec<String> = self.links.keys().cloned().collect();

        for id in ids {
            loop {
                let Some(link) = self.links.get_mut(&id) else {
                    break;
                };
                if link.state == ConnectionState::Closed {
                    break;
                }
                let frame = match link.channel.try_recv() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(NetError::ChannelClosed) => {
                        link.state = ConnectionState::Closed;
                        break;
                    }
                    Err(err) => {
                        self.report_fault(&id, &err);
                        break;
                    }
                };
                let envelope = match decode_envelope(&frame) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        self.report_fault(&id, &err);
                        continue;
                    }
                };
                if !self.admits(&id, &envelope) {
                    continue;
                }
                if self.role == Role::Host && is_relayed(&envelope.message) {
                    relays.push((id.clone(), frame));
                }
                inbound.push(Inbound {
                    link: id.clone(),
                    envelope,
                });
            }
        }

        for (from, frame) in relays {
            self.relay(&from, &frame);
        }
        self.reap_closed();
        inbound
    }

    /// Queue a message for one link, sent ahead of broadcasts on the next flush.
    pub fn send_to(&mut self, peer: &str, message: NetMessage) {
        self.direct.push((peer.to_string(), message));
    }

    /// Queue a message for every synced link.
    pub fn broadcast(&mut self, message: NetMessage) {
        self.outbound.push(message);
    }

    /// Messages waiting for the next flush.
    pub fn pending_outbound(&self) -> usize {
        self.direct.len() + self.outbound.len()
    }

    /// Host: the link has its bootstrap queued and now receives broadcasts.
    pub fn mark_synced(&mut self, peer: &str) {
        if let Some(link) = self.links.get_mut(peer) {
            if link.state != ConnectionState::Synced && link.state != ConnectionState::Closed {
                link.state = ConnectionState::Synced;
                info!(%peer, "peer joined");
                self.events.push(SessionEvent::PeerJoined {
                    peer: peer.to_string(),
                });
            }
        }
    }

    /// Joiner: INIT_SYNC has been applied.
    pub fn complete_bootstrap(&mut self) {
        if self.synced {
            return;
        }
        self.synced = true;
        self.bootstrap_pending = false;
        for link in self.links.values_mut() {
            if link.state == ConnectionState::AwaitingInit {
                link.state = ConnectionState::Synced;
            }
        }
        info!(peer = %self.local_id, "session synced");
        self.events.push(SessionEvent::Synced);
    }

    /// Encode and send every queued message. Returns the number of frames written.
    pub fn flush(&mut self) -> usize {
        let mut sent = 0;
        let direct = std::mem::take(&mut self.direct);
        for (peer, message) in direct {
            let Some(frame) = self.encode(message) else {
                continue;
            };
            if self.send_frame(&peer, frame) {
                sent += 1;
            }
        }

        let outbound = std::mem::take(&mut self.outbound);
        let targets: Vec<String> = self
            .links
            .iter()
            .filter(|(_, link)| link.state == ConnectionState::Synced)
            .map(|(id, _)| id.clone())
            .collect();
        for message in outbound {
            if targets.is_empty() {
                continue;
            }
            let Some(frame) = self.encode(message) else {
                continue;
            };
            for peer in &targets {
                if self.send_frame(peer, frame.clone()) {
                    sent += 1;
                }
            }
        }
        sent
    }

    /// Drain events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Close every link.
    pub fn close(&mut self) {
        for (id, link) in self.links.iter_mut() {
            debug!(peer = %id, "closing link");
            link.channel.close();
            link.state = ConnectionState::Closed;
        }
        self.reap_closed();
    }

    fn advance_handshakes(&mut self) {
        let mut requests = Vec::new();
        for (id, link) in self.links.iter_mut() {
            if link.state == ConnectionState::Connecting && link.channel.is_open() {
                link.state = ConnectionState::Open;
                debug!(peer = %id, "link open");
                self.events.push(SessionEvent::LinkOpened { peer: id.clone() });
            }
            if self.role == Role::Joiner && link.state == ConnectionState::Open {
                requests.push(id.clone());
                link.state = ConnectionState::AwaitingInit;
            }
        }
        for id in requests {
            info!(host = %id, "requesting initial state");
            self.send_to(&id, NetMessage::RequestInit { schema: self.schema });
        }
    }

    fn admits(&mut self, link: &str, envelope: &Envelope) -> bool {
        let kind = envelope.message.kind();
        if envelope.sender_id == self.local_id {
            debug!(%link, kind, "dropping own loopback message");
            return false;
        }
        match (self.role, &envelope.message) {
            (Role::Joiner, NetMessage::InitSync { .. }) => {
                if self.synced {
                    debug!(%link, "ignoring repeated INIT_SYNC");
                    return false;
                }
                self.bootstrap_pending = true;
                true
            }
            (Role::Joiner, NetMessage::RequestInit { .. }) => {
                debug!(%link, "joiners do not answer REQUEST_INIT");
                false
            }
            (Role::Joiner, message) => {
                if !self.synced && !self.bootstrap_pending {
                    debug!(%link, kind, "not yet synced, ignoring");
                    return false;
                }
                if message.is_host_authoritative() && envelope.sender_id != link {
                    warn!(%link, sender = %envelope.sender_id, kind, "host-only message from another peer, ignoring");
                    return false;
                }
                true
            }
            (Role::Host, NetMessage::RequestInit { schema }) => {
                if *schema == self.schema {
                    return true;
                }
                let err = NetError::Transport(format!(
                    "schema mismatch: peer {schema:#018x}, local {:#018x}",
                    self.schema
                ));
                warn!(%link, "rejecting joiner with incompatible protocol");
                self.events.push(SessionEvent::ConnectionFault {
                    peer: link.to_string(),
                    message: err.user_message(),
                    recoverable: false,
                });
                if let Some(entry) = self.links.get_mut(link) {
                    entry.channel.close();
                    entry.state = ConnectionState::Closed;
                }
                false
            }
            (Role::Host, message) if message.is_host_authoritative() => {
                warn!(%link, kind, "host-only message from a joiner, dropping");
                false
            }
            (Role::Host, _) => {
                if self.link_state(link) != Some(ConnectionState::Synced) {
                    debug!(%link, kind, "peer not yet synced, ignoring");
                    return false;
                }
                true
            }
        }
    }

    fn relay(&mut self, from: &str, frame: &[u8]) {
        let targets: Vec<String> = self
            .links
            .iter()
            .filter(|(id, link)| id.as_str() != from && link.state == ConnectionState::Synced)
            .map(|(id, _)| id.clone())
            .collect();
        for peer in targets {
            self.send_frame(&peer, frame.to_vec());
        }
    }

    fn encode(&mut self, message: NetMessage) -> Option<Vec<u8>> {
        let envelope = Envelope::new(self.local_id.clone(), message);
        match encode_envelope(&envelope) {
            Ok(frame) => Some(frame),
            Err(err) => {
                let local = self.local_id.clone();
                self.report_fault(&local, &err);
                None
            }
        }
    }

    fn send_frame(&mut self, peer: &str, frame: Vec<u8>) -> bool {
        let Some(link) = self.links.get_mut(peer) else {
            debug!(%peer, "dropping frame for unknown link");
            return false;
        };
        match link.channel.send(frame) {
            Ok(()) => true,
            Err(NetError::ChannelClosed) => {
                link.state = ConnectionState::Closed;
                false
            }
            Err(err) => {
                self.report_fault(peer, &err);
                false
            }
        }
    }

    fn reap_closed(&mut self) {
        let closed: Vec<String> = self
            .links
            .iter()
            .filter(|(_, link)| link.state == ConnectionState::Closed)
            .map(|(id, _)| id.clone())
            .collect();
        for peer in closed {
            self.links.remove(&peer);
            match self.role {
                Role::Host => {
                    info!(%peer, "peer left");
                    self.outbound.push(NetMessage::PeerLeft { peer: peer.clone() });
                    self.events.push(SessionEvent::PeerLeft { peer });
                }
                Role::Joiner => {
                    warn!(host = %peer, "lost connection to host");
                    self.events.push(SessionEvent::HostLost);
                }
            }
        }
    }
}

/// Joiner traffic the host forwards to the other joiners.
fn is_relayed(message: &NetMessage) -> bool {
    !message.is_host_authoritative() && !matches!(message, NetMessage::RequestInit { .. })
}
