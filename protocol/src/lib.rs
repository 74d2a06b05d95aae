// Copyright (c) 2026 Spartic Contributors. MIT License.
// See LICENSE for details.

//! # Spartic — Core Protocol Library
//!
//! Sender-anonymous messaging for small, closed groups, built on
//! *synchronized keystreams*: N participants each emit a pseudorandom
//! stream constructed so the XOR of all N streams is identically zero.
//! Everyone XORs their payload (usually nothing) into their own stream and
//! broadcasts the result; XOR all the broadcasts together and the streams
//! vanish, leaving the payloads with no author attached. Nobody forwards
//! anybody's traffic — each participant only ever transmits bytes they
//! generated themselves — and still no observer, inside the group or out,
//! can say who wrote what.
//!
//! The price is honest and worth stating up front: bandwidth scales with
//! the group (everyone transmits every round), any N−1 members colluding
//! can unmask the last one (that's the information-theoretic floor for
//! this construction, not a bug), and deciding *who* gets to write into a
//! given round is a contention problem this crate deliberately leaves to
//! the layer above.
//!
//! ## Architecture
//!
//! The modules mirror the actual layers of the system:
//!
//! - **crypto** — identity keys and pairwise shared secrets. Boring on
//!   purpose.
//! - **keystream** — the XOR-to-zero stream construction. The one clever
//!   thing in the crate.
//! - **session** — the per-group state machine: key exchange, rounds,
//!   results, outbound queues. Synchronous, deterministic, I/O-free.
//! - **network** — the wire codec, the transport contract, and the router
//!   that connects sessions to the outside world.
//! - **config** — protocol constants and network parameters.
//!
//! ## Design Philosophy
//!
//! 1. The protocol state machine never does I/O. Ever.
//! 2. Peer misbehavior is data (reported to the peer); caller misbehavior
//!    is a bug (returned as an error).
//! 3. No unsafe code. Secrets are zeroized and never logged.
//! 4. If it touches the anonymity property, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod keystream;
pub mod network;
pub mod session;
