//! # Pairwise Shared Secrets
//!
//! A [`SharedSecret`] is one half of the keying material for one ordered
//! pair of participants. Each party of a pair generates a half, sends it to
//! the other over the authenticated, encrypted transport channel, and keeps
//! the half it receives. Both halves go into both parties' keystream secret
//! lists, so the pair's effective contribution is the XOR of the two — a
//! value neither side can choose unilaterally without the other seeing it.
//!
//! Unlike the identity keys next door, these secrets ARE meant to travel:
//! `SharedSecret` implements `Serialize`/`Deserialize` because the key
//! exchange transmits it verbatim inside a [`KeyMessage`]. The transport's
//! channel encryption is what keeps it off the wire in the clear — handing
//! a `SharedSecret` to an unauthenticated channel defeats the whole scheme.
//!
//! [`KeyMessage`]: crate::network::wire::WireMessage
//!
//! ## Hygiene
//!
//! Secrets are zeroized on drop and keep themselves out of `Debug` output.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::config::SECRET_SIZE;

/// A 32-byte uniformly random pairwise secret. One XSalsa20 key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSecret {
    bytes: [u8; SECRET_SIZE],
}

impl SharedSecret {
    /// Generate a fresh secret from the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wrap existing secret bytes, e.g. one received from a peer.
    pub fn from_bytes(bytes: [u8; SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// The raw secret bytes, for keying a stream cipher.
    pub fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.bytes
    }
}

impl Zeroize for SharedSecret {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 32 bytes of key material stays out of logs, full stop.
        write!(f, "SharedSecret(..)")
    }
}
