//! # The Synchronized Keystream
//!
//! The cryptographic heart of Spartic. Every participant in a group holds a
//! [`SynchronizedKeystream`] built from pairwise shared secrets, and the
//! construction guarantees one remarkable property: **the XOR of all N
//! participants' streams is identically zero**, at every sequence number,
//! for every length.
//!
//! How: each unordered pair of participants `{p, q}` contributes two 32-byte
//! secret halves — one generated by `p`, one by `q`, each transmitted to the
//! other over the authenticated channel. Both halves land in both parties'
//! secret lists and in nobody else's. A participant's stream is the XOR of
//! one XSalsa20 keystream per secret in its list, so every pairwise cipher
//! stream appears in exactly two participants' outputs and cancels when the
//! group XORs everything together. What's left is whatever the participants
//! XORed in on top — with no way to tell who contributed which bits.
//!
//! ## Nonce discipline
//!
//! The cipher nonce is the round's sequence number, big-endian, in the low
//! 8 bytes of the 24-byte XSalsa20 nonce. Reading the same sequence number
//! twice therefore yields the *same* bytes — which is exactly what the
//! round protocol needs, and exactly what makes reuse catastrophic. Never
//! XOR two different plaintexts against the same sequence number: that is
//! the classic two-time pad and it hands an observer the XOR of your
//! messages for free. The session layer enforces one block per sequence
//! number; if you hold a raw keystream, the discipline is on you.

use salsa20::cipher::{KeyIvInit, StreamCipher};
use salsa20::{Key, XNonce, XSalsa20};
use zeroize::Zeroizing;

use crate::config::{self, BLOCK_SIZE};
use crate::crypto::SharedSecret;
use crate::keystream::KeystreamBlock;

/// An immutable bundle of pairwise secrets that yields this participant's
/// member of a synchronized keystream set.
///
/// The secret list is stored exactly as given. Order is irrelevant to the
/// output's synchronization property (XOR commutes) and duplicates are
/// permitted — two identical secrets cancel, contributing nothing, which is
/// harmless. A session builds the list by walking its peers in stable order
/// and pushing both halves of each pair; see the `session` module.
///
/// `read` is a pure function of `(secrets, sequence, length)`: no internal
/// state survives a call, so reads may happen in any order, more than once,
/// from anywhere.
pub struct SynchronizedKeystream {
    secrets: Vec<SharedSecret>,
}

impl SynchronizedKeystream {
    /// Bundle a list of pairwise secrets into a keystream.
    pub fn new(secrets: Vec<SharedSecret>) -> Self {
        Self { secrets }
    }

    /// Number of secrets in the bundle. A correctly keyed N-party session
    /// holds `2 * (N - 1)` of them.
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }

    /// Produce `length` bytes of keystream for the given sequence number.
    ///
    /// The output is the XOR over all secrets `k` of the XSalsa20 keystream
    /// keyed by `k` with nonce `[0u8; 16] ‖ be64(sequence_number)`, taken
    /// from position zero. Deterministic: identical inputs give identical
    /// bytes, always.
    ///
    /// Cannot fail (allocation aside). An empty secret list yields zeros,
    /// which is the correct degenerate case for a "group" of one.
    pub fn read(&self, sequence_number: u64, length: usize) -> Vec<u8> {
        let nonce_bytes = config::stream_nonce(sequence_number);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let mut out = vec![0u8; length];
        // Scratch lane for one cipher's keystream. Individual pairwise
        // streams are secret material even though their XOR is broadcast,
        // so the lane is wiped when we're done.
        let mut lane = Zeroizing::new(vec![0u8; length]);

        for secret in &self.secrets {
            lane.fill(0);
            let mut cipher = XSalsa20::new(Key::from_slice(secret.as_bytes()), nonce);
            cipher.apply_keystream(&mut lane);
            for (dst, src) in out.iter_mut().zip(lane.iter()) {
                *dst ^= src;
            }
        }

        out
    }

    /// Read one full round block: `read(sequence_number, BLOCK_SIZE)`.
    pub fn read_block(&self, sequence_number: u64) -> KeystreamBlock {
        KeystreamBlock::from_vec(self.read(sequence_number, BLOCK_SIZE))
            .expect("read() returned the requested length")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds keystreams for `n` participants with correctly paired secret
    /// lists: each unordered pair {i, j} gets two fresh secrets, both pushed
    /// to both members. This mirrors what a session does after key exchange.
    fn paired_keystreams(n: usize) -> Vec<SynchronizedKeystream> {
        let mut lists: Vec<Vec<SharedSecret>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let half_i = SharedSecret::generate();
                let half_j = SharedSecret::generate();
                lists[i].push(half_i.clone());
                lists[i].push(half_j.clone());
                lists[j].push(half_i);
                lists[j].push(half_j);
            }
        }
        lists.into_iter().map(SynchronizedKeystream::new).collect()
    }

    fn xor_all(streams: &[SynchronizedKeystream], sequence: u64, length: usize) -> Vec<u8> {
        let mut acc = vec![0u8; length];
        for stream in streams {
            for (dst, src) in acc.iter_mut().zip(stream.read(sequence, length)) {
                *dst ^= src;
            }
        }
        acc
    }

    #[test]
    fn two_party_streams_cancel() {
        let streams = paired_keystreams(2);
        assert!(xor_all(&streams, 0, BLOCK_SIZE).iter().all(|&b| b == 0));
    }

    #[test]
    fn many_party_streams_cancel_across_sequences_and_lengths() {
        for n in [3, 5] {
            let streams = paired_keystreams(n);
            for sequence in [0, 1, 7, u64::MAX] {
                for length in [1, 63, BLOCK_SIZE] {
                    let sum = xor_all(&streams, sequence, length);
                    assert!(
                        sum.iter().all(|&b| b == 0),
                        "streams failed to cancel for n={n} seq={sequence} len={length}"
                    );
                }
            }
        }
    }

    #[test]
    fn read_is_deterministic() {
        let stream = SynchronizedKeystream::new(vec![
            SharedSecret::from_bytes([7u8; 32]),
            SharedSecret::from_bytes([9u8; 32]),
        ]);
        assert_eq!(stream.read(42, 512), stream.read(42, 512));
    }

    #[test]
    fn shorter_reads_are_prefixes() {
        // All reads start at cipher position zero, so a shorter read of the
        // same sequence number is a prefix of a longer one.
        let stream = SynchronizedKeystream::new(vec![SharedSecret::from_bytes([1u8; 32])]);
        let long = stream.read(3, 1024);
        let short = stream.read(3, 100);
        assert_eq!(short, long[..100]);
    }

    #[test]
    fn distinct_sequences_differ() {
        let stream = SynchronizedKeystream::new(vec![SharedSecret::generate()]);
        assert_ne!(stream.read(0, 256), stream.read(1, 256));
    }

    #[test]
    fn participants_streams_are_distinct() {
        // Any two participants' reads for the same position should differ —
        // with random secrets a collision means something is deeply wrong.
        let streams = paired_keystreams(3);
        let a = streams[0].read(0, BLOCK_SIZE);
        let b = streams[1].read(0, BLOCK_SIZE);
        let c = streams[2].read(0, BLOCK_SIZE);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn duplicate_secrets_cancel() {
        let secret = SharedSecret::generate();
        let stream = SynchronizedKeystream::new(vec![secret.clone(), secret]);
        assert!(stream.read(5, 128).iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_secret_list_reads_zeros() {
        let stream = SynchronizedKeystream::new(Vec::new());
        assert!(stream.read(0, 64).iter().all(|&b| b == 0));
    }

    #[test]
    fn read_block_is_block_sized() {
        let stream = SynchronizedKeystream::new(vec![SharedSecret::generate()]);
        assert_eq!(stream.read_block(0).as_bytes().len(), BLOCK_SIZE);
    }
}
