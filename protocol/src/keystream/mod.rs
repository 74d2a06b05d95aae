//! # Synchronized Keystreams
//!
//! The primitive that makes Spartic work: N pseudorandom streams, one per
//! participant, whose XOR across the whole group is identically zero. Each
//! participant XORs its payload (or nothing) into its own stream before
//! broadcasting; XORing all broadcast blocks together strips every stream
//! away and leaves the payloads, authorless.
//!
//! Two pieces:
//!
//! - [`KeystreamBlock`] — the fixed-size block type and its XOR arithmetic.
//! - [`SynchronizedKeystream`] — pairwise secrets in, keystream bytes out,
//!   indexed by round sequence number.

mod block;
mod synchronized;

pub use block::KeystreamBlock;
pub use synchronized::SynchronizedKeystream;
