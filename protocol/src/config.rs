//! # Protocol Configuration & Constants
//!
//! Every magic number in Spartic lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are load-bearing for interoperability: two
//! participants that disagree on `BLOCK_SIZE` or the nonce layout will
//! produce keystreams that don't cancel, and every round result will come
//! out as noise. Change them only in lockstep with everyone you ever intend
//! to talk to.

// ---------------------------------------------------------------------------
// Protocol Identification
// ---------------------------------------------------------------------------

/// Name of the per-peer wire protocol. Transports use this string to select
/// the Spartic logical channels when multiplexing a peer connection.
pub const PROTOCOL_NAME: &str = "spartic";

/// Wire protocol version. Bump on any change to the message encoding.
pub const WIRE_PROTOCOL_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Size of one round's payload block, in bytes. Every participant emits
/// exactly one block of this size per round, whether or not they have
/// anything to say — that's where the anonymity comes from.
pub const BLOCK_SIZE: usize = 4096;

/// Length of a pairwise shared secret in bytes. One XSalsa20 key.
pub const SECRET_SIZE: usize = 32;

/// Length of the seed an identity keypair is derived from. Ed25519 secret
/// keys are their own seed, so this equals the secret key length.
pub const SEED_SIZE: usize = 32;

/// XSalsa20 — 256-bit key, 192-bit nonce. The extended nonce is the whole
/// point: we can afford to burn one nonce per round forever without ever
/// worrying about collisions. 24 bytes.
pub const STREAM_NONCE_LENGTH: usize = 24;

/// How many bytes at the tail of the nonce carry the big-endian sequence
/// number. The leading `STREAM_NONCE_LENGTH - 8` bytes are zero.
pub const STREAM_NONCE_SEQUENCE_BYTES: usize = 8;

// ---------------------------------------------------------------------------
// Session Parameters
// ---------------------------------------------------------------------------

/// Maximum number of rounds that may be live at once: the current round and
/// the one directly after it. A block for any other sequence number is
/// rejected as out-of-window.
pub const PIPELINE_DEPTH: usize = 2;

/// Builds the XSalsa20 nonce for a round: sixteen zero bytes followed by the
/// big-endian sequence number.
pub fn stream_nonce(sequence_number: u64) -> [u8; STREAM_NONCE_LENGTH] {
    let mut nonce = [0u8; STREAM_NONCE_LENGTH];
    nonce[STREAM_NONCE_LENGTH - STREAM_NONCE_SEQUENCE_BYTES..]
        .copy_from_slice(&sequence_number.to_be_bytes());
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_places_sequence_in_low_bytes() {
        let nonce = stream_nonce(0x0102030405060708);
        assert_eq!(&nonce[..16], &[0u8; 16]);
        assert_eq!(&nonce[16..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn nonce_for_sequence_zero_is_all_zero() {
        assert_eq!(stream_nonce(0), [0u8; STREAM_NONCE_LENGTH]);
    }

    #[test]
    fn distinct_sequences_give_distinct_nonces() {
        assert_ne!(stream_nonce(1), stream_nonce(2));
        assert_ne!(stream_nonce(0), stream_nonce(u64::MAX));
    }

    #[test]
    fn crypto_parameter_sizes() {
        assert_eq!(SECRET_SIZE, 32);
        assert_eq!(SEED_SIZE, 32);
        assert_eq!(STREAM_NONCE_LENGTH, 24);
        assert_eq!(BLOCK_SIZE, 4096);
    }
}
