//! # Cryptographic Primitives for Spartic
//!
//! This module is the foundation of everything security-related in the
//! protocol. Deliberately boring, well-audited choices:
//!
//! - **Ed25519** for identity — fast, deterministic, and nobody has broken it.
//! - **XSalsa20** for the synchronized keystreams — an extended 24-byte
//!   nonce means a round's sequence number can be the nonce, forever,
//!   without bookkeeping (see the `keystream` module for how it's used).
//! - **OS RNG** for every secret we generate.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. The novel construction in Spartic is how standard primitives
//! are *combined* (N streams XORing to zero), not the primitives themselves.
//! Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these types, please
//! reconsider. Then reconsider again.

pub mod keys;
pub mod secret;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy.
pub use keys::{verify_identity, KeyError, ParticipantId, SparticKeypair};
pub use secret::SharedSecret;
