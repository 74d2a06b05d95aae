//! # Wire Codec
//!
//! The three Spartic message kinds and their byte encoding. The framing —
//! length prefixes, channel multiplexing, encryption — belongs to the
//! transport; this module only decides what goes inside one frame.
//!
//! Encoding is bincode with varint integers: group ids and sequence numbers
//! are small in practice, so they cost a byte or three instead of a fixed
//! eight, and a block message is dominated by its 4096 payload bytes rather
//! than header overhead. The enum tag is part of the encoding, which makes
//! the format self-describing enough for a single logical channel, while
//! transports that run one channel per kind can still route on
//! [`WireMessage::kind`].

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::SharedSecret;
use crate::session::GroupId;

/// Errors from encoding or decoding a wire message.
#[derive(Debug, Error)]
pub enum WireError {
    /// Serialization failed. With in-memory buffers this effectively does
    /// not happen, but the type system doesn't know that.
    #[error("failed to encode wire message")]
    Encode(#[source] bincode::Error),

    /// The peer sent bytes that don't parse as any message kind.
    #[error("failed to decode wire message")]
    Decode(#[source] bincode::Error),
}

/// One Spartic frame, as it travels between two peers.
///
/// `Key` and `Block` carry the group they belong to, because one peer
/// connection multiplexes every group the two participants share. `Error`
/// deliberately does not: it is a human-readable complaint about the peer's
/// traffic, not protocol state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    /// One half of a pairwise shared secret, sent during key exchange.
    Key {
        /// The group this key belongs to.
        group_id: GroupId,
        /// The sender's freshly generated secret half.
        shared_key: SharedSecret,
    },
    /// One participant's block for one round.
    Block {
        /// The group this block belongs to.
        group_id: GroupId,
        /// The round the block was produced for.
        sequence_number: u64,
        /// Keystream XOR payload. Must be exactly `BLOCK_SIZE` bytes; the
        /// receiving session enforces it.
        block: Vec<u8>,
    },
    /// A protocol complaint, UTF-8 text.
    Error {
        /// What the sender thinks went wrong.
        text: String,
    },
}

impl WireMessage {
    /// The group a message is scoped to, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::Key { group_id, .. } | Self::Block { group_id, .. } => Some(*group_id),
            Self::Error { .. } => None,
        }
    }

    /// Short kind tag for logging and per-kind channel selection.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Block { .. } => "block",
            Self::Error { .. } => "error",
        }
    }
}

/// The bincode configuration every Spartic endpoint must agree on.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
}

/// Encode a message into the bytes of one transport frame.
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, WireError> {
    codec().serialize(message).map_err(WireError::Encode)
}

/// Decode one transport frame. Trailing garbage is an error — a frame is
/// exactly one message.
pub fn decode(bytes: &[u8]) -> Result<WireMessage, WireError> {
    codec().deserialize(bytes).map_err(WireError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BLOCK_SIZE;

    #[test]
    fn key_message_roundtrip() {
        let message = WireMessage::Key {
            group_id: 42,
            shared_key: SharedSecret::from_bytes([7u8; 32]),
        };
        let decoded = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn block_message_roundtrip() {
        let message = WireMessage::Block {
            group_id: 1,
            sequence_number: 99,
            block: vec![0xAB; BLOCK_SIZE],
        };
        let decoded = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn error_message_roundtrip() {
        let message = WireMessage::Error {
            text: "block is already here".to_string(),
        };
        let decoded = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn varint_keeps_headers_small() {
        // A key message is a tag, a varint group id, and 32 secret bytes.
        // If this grows past 40 bytes, someone switched to fixed-width
        // integers and every message on the wire got fatter.
        let message = WireMessage::Key {
            group_id: 3,
            shared_key: SharedSecret::from_bytes([0u8; 32]),
        };
        assert!(encode(&message).unwrap().len() <= 40);

        // Block overhead on top of the payload should stay in the tens of
        // bytes, not hundreds.
        let message = WireMessage::Block {
            group_id: 3,
            sequence_number: 12,
            block: vec![0u8; BLOCK_SIZE],
        };
        let encoded = encode(&message).unwrap();
        assert!(encoded.len() >= BLOCK_SIZE);
        assert!(encoded.len() <= BLOCK_SIZE + 16);
    }

    #[test]
    fn json_serialization_roundtrip() {
        // The wire runs bincode, but tooling (debug dumps, fixtures) leans
        // on the same serde derives producing sane JSON.
        let message = WireMessage::Block {
            group_id: 8,
            sequence_number: 3,
            block: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&message).expect("serialize");
        let recovered: WireMessage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(message, recovered);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(decode(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut encoded = encode(&WireMessage::Error {
            text: "x".to_string(),
        })
        .unwrap();
        encoded.push(0);
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn kind_tags() {
        let key = WireMessage::Key {
            group_id: 0,
            shared_key: SharedSecret::from_bytes([0u8; 32]),
        };
        assert_eq!(key.kind(), "key");
        assert_eq!(key.group_id(), Some(0));

        let error = WireMessage::Error {
            text: String::new(),
        };
        assert_eq!(error.kind(), "error");
        assert_eq!(error.group_id(), None);
    }
}
