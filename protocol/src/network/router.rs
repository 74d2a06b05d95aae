//! # The Router
//!
//! The seam between the synchronous session state machines and the
//! asynchronous transport. The router owns every session, demultiplexes
//! inbound frames onto the right one, and drains session outbound queues
//! onto live peer connections. Sessions never see the transport; the
//! transport never sees a session. That strict ownership — router owns
//! sessions, sessions hold no back-reference — is what keeps the protocol
//! logic pure and the I/O in one place.
//!
//! ## Isolation
//!
//! The router is the sole enforcer of session membership: a frame from a
//! peer reaches a session only if that peer is in the session's membership
//! set for the frame's group. Everything else — unknown group, known group
//! but foreign sender — earns the sender a text error and goes no further.
//! Cross-group delivery cannot happen.
//!
//! ## Locking discipline
//!
//! Session state sits behind a `parking_lot` mutex and messengers in a
//! `DashMap`, so inbound dispatch and outbound drain may run from
//! different tasks. No lock is ever held across an `.await` — every
//! transport send happens with the session table released, which also
//! makes it safe for a messenger implementation to call straight back
//! into a router (the loopback pattern the tests use).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crypto::ParticipantId;
use crate::keystream::KeystreamBlock;
use crate::network::transport::{Messenger, Transport, TransportError};
use crate::network::wire::WireMessage;
use crate::session::{GroupId, OutboundMessage, SessionError, SessionState, SparticSession};

// Router-level peer errors. Unlike the session's, these cover traffic that
// never matched a session at all.
pub(crate) const ERR_UNEXPECTED_KEY: &str = "unexpected key";
pub(crate) const ERR_UNEXPECTED_BLOCK: &str = "unexpected block";

/// Errors returned to the local caller by router operations.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A session for this group already exists.
    #[error("group {0} already has a session")]
    DuplicateGroup(GroupId),

    /// No session exists for this group.
    #[error("no session for group {0}")]
    UnknownGroup(GroupId),

    /// The underlying session rejected a local-caller operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The transport failed to schedule a connection.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Per-participant message router. One per process, shared by every group
/// the local participant is in.
pub struct Router<T: Transport> {
    transport: Arc<T>,
    sessions: Mutex<HashMap<GroupId, SparticSession>>,
    messengers: DashMap<ParticipantId, Arc<dyn Messenger>>,
}

impl<T: Transport> Router<T> {
    /// Wrap a transport endpoint in a router with no sessions yet.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            sessions: Mutex::new(HashMap::new()),
            messengers: DashMap::new(),
        }
    }

    /// The local participant's identity, as authenticated by the transport.
    pub fn local_id(&self) -> ParticipantId {
        self.transport.local_id()
    }

    /// Create the session for a group and ask the transport to reach every
    /// member. The session immediately queues its key-exchange messages;
    /// they flow out as soon as connections come up — or right away, for
    /// peers some other group already connected us to.
    pub async fn create_session(
        &self,
        group_id: GroupId,
        other_pubkeys: BTreeSet<ParticipantId>,
    ) -> Result<(), RouterError> {
        let peers: Vec<ParticipantId> = other_pubkeys.iter().copied().collect();

        {
            let mut sessions = self.sessions.lock();
            if sessions.contains_key(&group_id) {
                return Err(RouterError::DuplicateGroup(group_id));
            }
            let session = SparticSession::new(group_id, other_pubkeys)?;
            sessions.insert(group_id, session);
        }
        info!(group = group_id, peers = peers.len(), "session registered");

        for peer in peers {
            self.transport.join_peer(peer).await?;
        }
        self.send_session_messages(group_id).await?;
        Ok(())
    }

    /// Register a freshly authenticated peer connection and flush every
    /// session that was waiting on it.
    pub async fn handle_connection(&self, messenger: Arc<dyn Messenger>) {
        let peer = messenger.peer();
        info!(peer = %peer.log_id(), "peer connected");
        self.messengers.insert(peer, messenger);

        let groups: Vec<GroupId> = {
            let sessions = self.sessions.lock();
            sessions
                .iter()
                .filter(|(_, session)| session.is_member(&peer))
                .map(|(group_id, _)| *group_id)
                .collect()
        };
        for group_id in groups {
            if let Err(err) = self.send_session_messages(group_id).await {
                warn!(group = group_id, %err, "drain after connect failed");
            }
        }
    }

    /// Forget a peer's messenger. Sessions keep queueing for the peer; the
    /// backlog flows when the transport reconnects.
    pub fn handle_disconnection(&self, peer: &ParticipantId) {
        if self.messengers.remove(peer).is_some() {
            info!(peer = %peer.log_id(), "peer disconnected");
        }
    }

    /// Dispatch one inbound frame from an authenticated peer.
    ///
    /// Frames that match a session the sender belongs to are delivered and
    /// that session's queues are drained (delivery often generates
    /// replies). Everything else is answered with a text error to the
    /// sender — never delivered across groups, never dropped silently.
    pub async fn handle_message(&self, from: ParticipantId, message: WireMessage) {
        debug!(peer = %from.log_id(), kind = message.kind(), "inbound message");

        let mut rejection: Option<&'static str> = None;
        let mut delivered: Option<GroupId> = None;

        {
            let mut sessions = self.sessions.lock();
            match message {
                WireMessage::Key {
                    group_id,
                    shared_key,
                } => match sessions.get_mut(&group_id) {
                    Some(session) if session.is_member(&from) => {
                        if let Err(err) = session.receive_key(&from, shared_key) {
                            warn!(group = group_id, peer = %from.log_id(), %err, "inbound key rejected");
                        }
                        delivered = Some(group_id);
                    }
                    _ => rejection = Some(ERR_UNEXPECTED_KEY),
                },
                WireMessage::Block {
                    group_id,
                    sequence_number,
                    block,
                } => match sessions.get_mut(&group_id) {
                    Some(session) if session.is_member(&from) => {
                        if let Err(err) = session.receive_block(&from, sequence_number, block) {
                            warn!(group = group_id, peer = %from.log_id(), %err, "inbound block rejected");
                        }
                        delivered = Some(group_id);
                    }
                    _ => rejection = Some(ERR_UNEXPECTED_BLOCK),
                },
                WireMessage::Error { text } => {
                    // A peer's complaint is information for the operator,
                    // not protocol input.
                    warn!(peer = %from.log_id(), complaint = %text, "peer reported an error");
                }
            }
        }

        if let Some(text) = rejection {
            warn!(peer = %from.log_id(), error = text, "rejecting unroutable message");
            self.reply_error(&from, text).await;
        }
        if let Some(group_id) = delivered {
            if let Err(err) = self.send_session_messages(group_id).await {
                warn!(group = group_id, %err, "drain after delivery failed");
            }
        }
    }

    /// Drain a session's outbound queues onto live messengers.
    ///
    /// Per-peer FIFO order is preserved; peers without a live messenger
    /// keep their backlog. A failed send marks the messenger dead, puts
    /// the message back at the head of the queue, and moves on.
    pub async fn send_session_messages(&self, group_id: GroupId) -> Result<(), RouterError> {
        let peers: Vec<ParticipantId> = {
            let sessions = self.sessions.lock();
            let session = sessions
                .get(&group_id)
                .ok_or(RouterError::UnknownGroup(group_id))?;
            session.other_pubkeys().copied().collect()
        };

        for peer in peers {
            let Some(messenger) = self.messengers.get(&peer).map(|m| Arc::clone(m.value()))
            else {
                continue;
            };

            loop {
                let outbound = {
                    let mut sessions = self.sessions.lock();
                    sessions
                        .get_mut(&group_id)
                        .and_then(|session| session.pop_message(&peer))
                };
                let Some(outbound) = outbound else { break };

                let wire = to_wire(group_id, outbound.clone());
                if let Err(err) = messenger.send(wire).await {
                    warn!(
                        group = group_id,
                        peer = %peer.log_id(),
                        %err,
                        "send failed, dropping messenger"
                    );
                    self.messengers.remove(&peer);
                    let mut sessions = self.sessions.lock();
                    if let Some(session) = sessions.get_mut(&group_id) {
                        session.requeue_message(&peer, outbound);
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    /// Contribute the local payload to a group's current round. Call
    /// [`send_session_messages`](Self::send_session_messages) afterwards
    /// to push the resulting block to the peers.
    pub fn participate_in_round(
        &self,
        group_id: GroupId,
        message: &[u8],
    ) -> Result<(), RouterError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&group_id)
            .ok_or(RouterError::UnknownGroup(group_id))?;
        session.participate_in_round(message)?;
        Ok(())
    }

    /// Whether a group's current round is open for local participation.
    pub fn ready_to_participate(&self, group_id: GroupId) -> bool {
        self.sessions
            .lock()
            .get(&group_id)
            .is_some_and(|session| session.ready_to_participate())
    }

    /// Pop the oldest unread round result for a group.
    pub fn pop_result(&self, group_id: GroupId) -> Option<KeystreamBlock> {
        self.sessions.lock().get_mut(&group_id)?.pop_result()
    }

    /// A group session's lifecycle state, if the group exists.
    pub fn session_state(&self, group_id: GroupId) -> Option<SessionState> {
        self.sessions.lock().get(&group_id).map(|s| s.state())
    }

    /// Reply to a peer with a router-level error, if it is still connected.
    async fn reply_error(&self, peer: &ParticipantId, text: &str) {
        let Some(messenger) = self.messengers.get(peer).map(|m| Arc::clone(m.value())) else {
            return;
        };
        let reply = WireMessage::Error {
            text: text.to_string(),
        };
        if let Err(err) = messenger.send(reply).await {
            warn!(peer = %peer.log_id(), %err, "error reply failed");
            self.messengers.remove(peer);
        }
    }
}

/// Stamp the owning group onto a session's outbound message.
fn to_wire(group_id: GroupId, message: OutboundMessage) -> WireMessage {
    match message {
        OutboundMessage::Key(shared_key) => WireMessage::Key {
            group_id,
            shared_key,
        },
        OutboundMessage::Block {
            sequence_number,
            block,
        } => WireMessage::Block {
            group_id,
            sequence_number,
            block: block.into_vec(),
        },
        OutboundMessage::Error(text) => WireMessage::Error { text },
    }
}
