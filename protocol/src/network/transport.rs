//! # The Transport Contract
//!
//! Spartic's core does not dial, listen, encrypt, or retry. It consumes a
//! transport that does, through the two traits here. Concrete
//! implementations — direct TCP with a Noise handshake, WebRTC data
//! channels signalled through a tracker, whatever — live outside this
//! crate.
//!
//! What the core assumes of an implementation:
//!
//! - **Authenticated**: a [`Messenger`]'s `peer()` identity has been proven
//!   cryptographically at connect time. The router trusts it completely —
//!   it is the basis for session isolation.
//! - **Reliable and ordered per peer**: messages arrive intact, exactly
//!   once, in the order sent. The round protocol tolerates cross-peer
//!   reordering but not loss.
//! - **Message-framed**: one [`WireMessage`] per frame, length handled by
//!   the transport.
//! - **Confidential**: pairwise secret halves travel in `Key` messages; an
//!   eavesdropper who reads one can reconstruct that pair's keystream
//!   contribution. The channel must be encrypted.
//! - **Multiplexed**: all groups two peers share ride one connection under
//!   the `"spartic"` protocol name.

use async_trait::async_trait;
use thiserror::Error;

use crate::crypto::ParticipantId;
use crate::network::wire::WireMessage;

/// Errors surfaced by transport implementations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No live connection to the peer.
    #[error("peer is not connected")]
    NotConnected,

    /// A connection attempt could not even be scheduled.
    #[error("connection attempt failed: {0}")]
    ConnectionFailed(String),

    /// The connection died while sending.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// The long-lived transport endpoint for the local participant.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The local participant's authenticated identity.
    fn local_id(&self) -> ParticipantId;

    /// Schedule a connection attempt to a peer. Resolution is asynchronous:
    /// success is reported later by handing the router a [`Messenger`], not
    /// by this call returning.
    async fn join_peer(&self, peer: ParticipantId) -> Result<(), TransportError>;
}

/// A live, authenticated channel to one peer.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// The peer's authenticated identity.
    fn peer(&self) -> ParticipantId;

    /// Send one message. A returned error means the connection should be
    /// considered dead; the router will drop this messenger and keep
    /// queueing until the transport produces a fresh one.
    async fn send(&self, message: WireMessage) -> Result<(), TransportError>;
}
