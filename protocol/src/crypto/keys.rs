//! # Identity Keys
//!
//! Ed25519 keypair generation and the participant identity type.
//!
//! Every Spartic participant is named by the 32 bytes of an Ed25519 public
//! key. The core protocol treats that name as an opaque map key — it never
//! verifies signatures itself. Authentication happens at the transport layer,
//! which proves possession of the matching secret key at connect time and
//! hands the core an identity it can trust.
//!
//! ## Why Ed25519?
//!
//! - Deterministic signatures (no k-value footguns like ECDSA).
//! - 128-bit security level in 32+32 bytes. Compact and sufficient.
//! - Constant-time implementations exist and are well-audited.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek).
//! - We use OS-level RNG (`OsRng`) for key generation. If your OS RNG is
//!   broken, you have bigger problems than Spartic.
//! - Key bytes are never logged. If you add logging to this module, you
//!   will be asked to leave.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::SEED_SIZE;

/// Errors that can occur during key operations.
///
/// These are intentionally vague about *why* something failed — leaking
/// details about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: wrong length")]
    InvalidPublicKey,
}

/// The 32-byte public identity of a Spartic participant.
///
/// This is what groups are made of and what every session map is keyed by.
/// Identities compare and order by raw byte value — byte-lexicographic
/// ordering is also the *stable peer order* used when a session assembles
/// its keystream secret list, so `Ord` here is protocol-relevant, not just
/// a convenience.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId {
    bytes: [u8; 32],
}

impl ParticipantId {
    /// Wrap raw public key bytes. No curve validation — the core treats
    /// identities as opaque names; the transport is responsible for proving
    /// a peer actually controls the matching secret key.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Try to build an identity from a byte slice, checking only the length.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// The raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex-encoded representation. 64 characters for 32 bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a hex-encoded identity.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    /// Short hex prefix for log lines. Eight characters is plenty to tell
    /// group members apart and short enough to keep logs readable.
    pub fn log_id(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantId({})", self.log_id())
    }
}

/// A Spartic identity keypair wrapping an Ed25519 signing key.
///
/// The core protocol only ever needs the public half; the signing half
/// exists so transports can authenticate the connection. `SparticKeypair`
/// intentionally does NOT implement `Serialize`/`Deserialize` — serializing
/// private keys should be a deliberate, conscious act, not something that
/// happens because someone shoved a keypair into a JSON response. Use
/// `to_bytes()` / `from_bytes()` explicitly.
pub struct SparticKeypair {
    signing_key: SigningKey,
}

impl SparticKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the 32-byte secret key *is* the seed. Useful for deriving
    /// identities from KDF output or recovered secrets.
    ///
    /// **Warning**: if you call this with a weak seed, you get a weak key.
    pub fn from_seed(seed: &[u8; SEED_SIZE]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Reconstruct a keypair from raw secret key bytes.
    pub fn from_bytes(secret_key_bytes: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self::from_seed(secret_key_bytes)
    }

    /// The participant identity derived from this keypair.
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Transports use this to prove identity at connect
    /// time; the core protocol itself never signs anything.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Export the raw 32-byte secret key material.
    ///
    /// **Handle with extreme care.** Don't log it, don't send it anywhere
    /// in plaintext, don't store it in a text file called "my_keys.txt".
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

/// Verify an Ed25519 signature against a participant identity.
///
/// Returns `false` for malformed identities as well as bad signatures — the
/// caller just wants a yes/no answer, and the difference is none of an
/// attacker's business.
pub fn verify_identity(id: &ParticipantId, message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(id.as_bytes()) else {
        return false;
    };
    let sig = DalekSignature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

impl Clone for SparticKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for SparticKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even "partially."
        write!(f, "SparticKeypair(pub={})", self.participant_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_32_byte_identity() {
        let kp = SparticKeypair::generate();
        assert_eq!(kp.participant_id().as_bytes().len(), 32);
    }

    #[test]
    fn two_generated_keypairs_are_different() {
        // If this fails, your RNG is broken and you should panic (the
        // emotion, not the macro). Well, actually, both.
        let a = SparticKeypair::generate();
        let b = SparticKeypair::generate();
        assert_ne!(a.participant_id(), b.participant_id());
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let a = SparticKeypair::from_seed(&seed);
        let b = SparticKeypair::from_seed(&seed);
        assert_eq!(a.participant_id(), b.participant_id());
    }

    #[test]
    fn sign_verify_roundtrip() {
        let kp = SparticKeypair::generate();
        let sig = kp.sign(b"spartic connect");
        assert!(verify_identity(&kp.participant_id(), b"spartic connect", &sig));
        assert!(!verify_identity(&kp.participant_id(), b"something else", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let a = SparticKeypair::generate();
        let b = SparticKeypair::generate();
        let sig = a.sign(b"message");
        assert!(!verify_identity(&b.participant_id(), b"message", &sig));
    }

    #[test]
    fn identity_hex_roundtrip() {
        let id = SparticKeypair::generate().participant_id();
        let recovered = ParticipantId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn identity_rejects_wrong_length() {
        assert!(ParticipantId::try_from_slice(&[0u8; 16]).is_err());
        assert!(ParticipantId::from_hex("deadbeef").is_err());
    }

    #[test]
    fn identities_order_byte_lexicographically() {
        // Stable peer order is byte-lexicographic; sessions depend on it.
        let lo = ParticipantId::from_bytes([0u8; 32]);
        let mut hi_bytes = [0u8; 32];
        hi_bytes[0] = 1;
        let hi = ParticipantId::from_bytes(hi_bytes);
        assert!(lo < hi);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = SparticKeypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("SparticKeypair(pub="));
        assert!(!debug_str.contains("signing_key"));
    }

    #[test]
    fn secret_key_roundtrip() {
        let kp = SparticKeypair::generate();
        let restored = SparticKeypair::from_bytes(&kp.to_bytes());
        assert_eq!(kp.participant_id(), restored.participant_id());
    }
}
