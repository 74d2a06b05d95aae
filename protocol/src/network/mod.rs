//! # Networking Seam
//!
//! Everything between a [`SparticSession`](crate::session::SparticSession)
//! and the actual wire:
//!
//! - **wire** — the three message kinds and their byte encoding.
//! - **transport** — the traits a concrete transport implements for us.
//! - **router** — owns the sessions, demultiplexes inbound frames, drains
//!   outbound queues.
//!
//! The division of labor is strict. Sessions decide *what* to send and how
//! to interpret what arrives; the router decides *where* messages go; the
//! transport decides *how* bytes move and who is on the other end. Each
//! layer can be tested with the layer below faked out.

pub mod router;
pub mod transport;
pub mod wire;

pub use router::{Router, RouterError};
pub use transport::{Messenger, Transport, TransportError};
pub use wire::{decode, encode, WireError, WireMessage};
