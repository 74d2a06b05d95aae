//! # Sessions
//!
//! The per-group protocol state. One [`SparticSession`] exists for each
//! group the local participant belongs to, and it is the only thing in the
//! crate that understands the round protocol:
//!
//! ```text
//!   router ──receive_key / receive_block──►  SparticSession
//!   router ◄──pop_message (per-peer FIFO)──  SparticSession
//!   caller ──participate_in_round──────────►  SparticSession
//!   caller ◄──pop_result───────────────────  SparticSession
//! ```
//!
//! Sessions are deliberately synchronous and I/O-free. Everything async —
//! connecting to peers, draining queues, dispatching inbound traffic —
//! lives in the `network` module.

pub mod machine;
pub mod round;

/// Identifies one group — one anonymity context. Chosen out-of-band by the
/// participants; the core only ever compares it and writes it on the wire.
pub type GroupId = u64;

pub use machine::{OutboundMessage, SessionError, SessionState, SparticSession};
pub use round::SessionRound;
