//! # Keystream Blocks
//!
//! Fixed-size byte blocks and the XOR arithmetic the whole protocol runs on.
//! A [`KeystreamBlock`] is always exactly [`BLOCK_SIZE`] bytes; the
//! constructors enforce it so the rest of the crate never has to re-check.

use std::fmt;

use crate::config::BLOCK_SIZE;

/// One round's worth of bytes: a block of exactly [`BLOCK_SIZE`].
///
/// Stored as `Vec<u8>` rather than `[u8; BLOCK_SIZE]` to keep moves cheap
/// and the type boxing-free, but the length invariant is absolute — every
/// constructor checks it.
#[derive(Clone, PartialEq, Eq)]
pub struct KeystreamBlock {
    bytes: Vec<u8>,
}

impl KeystreamBlock {
    /// The all-zero block. What a participant contributes when they have
    /// nothing to say this round.
    pub fn zero() -> Self {
        Self {
            bytes: vec![0u8; BLOCK_SIZE],
        }
    }

    /// Take ownership of a byte vector as a block. Returns `None` if the
    /// length is anything other than [`BLOCK_SIZE`].
    pub fn from_vec(bytes: Vec<u8>) -> Option<Self> {
        if bytes.len() != BLOCK_SIZE {
            return None;
        }
        Some(Self { bytes })
    }

    /// Copy a slice into a fresh block. Returns `None` on length mismatch.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != BLOCK_SIZE {
            return None;
        }
        Some(Self {
            bytes: slice.to_vec(),
        })
    }

    /// XOR another block into this one, in place.
    pub fn xor_in_place(&mut self, other: &KeystreamBlock) {
        for (dst, src) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *dst ^= src;
        }
    }

    /// XOR an arbitrary `BLOCK_SIZE` byte slice into this block.
    ///
    /// The caller guarantees the length; this is an internal seam used after
    /// the public entry points have already validated sizes.
    pub(crate) fn xor_bytes(&mut self, data: &[u8]) {
        debug_assert_eq!(data.len(), BLOCK_SIZE);
        for (dst, src) in self.bytes.iter_mut().zip(data.iter()) {
            *dst ^= src;
        }
    }

    /// XOR-fold any number of blocks into one. The identity element is the
    /// zero block, so folding nothing yields zeros.
    pub fn xor_fold<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a KeystreamBlock>,
    {
        let mut acc = Self::zero();
        for block in blocks {
            acc.xor_in_place(block);
        }
        acc
    }

    /// True if every byte is zero. After a round, an all-zero result means
    /// nobody (or an even number of colliding senders) wrote anything.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// The block's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the block, yielding its bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for KeystreamBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 4096 bytes of (usually) pseudorandom data makes for useless log
        // output; print a short prefix and the zero-ness instead.
        write!(
            f,
            "KeystreamBlock(head={}, zero={})",
            hex::encode(&self.bytes[..4]),
            self.is_zero()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(seed: u8) -> KeystreamBlock {
        let bytes: Vec<u8> = (0..BLOCK_SIZE)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect();
        KeystreamBlock::from_vec(bytes).unwrap()
    }

    #[test]
    fn zero_block_is_zero() {
        assert!(KeystreamBlock::zero().is_zero());
    }

    #[test]
    fn from_vec_rejects_wrong_lengths() {
        assert!(KeystreamBlock::from_vec(vec![0u8; BLOCK_SIZE - 1]).is_none());
        assert!(KeystreamBlock::from_vec(vec![0u8; BLOCK_SIZE + 1]).is_none());
        assert!(KeystreamBlock::from_vec(vec![0u8; 0]).is_none());
        assert!(KeystreamBlock::from_vec(vec![0u8; BLOCK_SIZE]).is_some());
    }

    #[test]
    fn xor_is_self_inverse() {
        let a = patterned(7);
        let mut acc = a.clone();
        acc.xor_in_place(&a);
        assert!(acc.is_zero());
    }

    #[test]
    fn xor_fold_of_pairs_cancels() {
        let a = patterned(1);
        let b = patterned(2);
        let folded = KeystreamBlock::xor_fold([&a, &b, &a, &b]);
        assert!(folded.is_zero());
    }

    #[test]
    fn xor_fold_of_nothing_is_zero() {
        assert!(KeystreamBlock::xor_fold([]).is_zero());
    }

    #[test]
    fn xor_fold_recovers_single_odd_element() {
        let a = patterned(3);
        let b = patterned(9);
        // a appears twice (cancels), b once (survives).
        let folded = KeystreamBlock::xor_fold([&a, &b, &a]);
        assert_eq!(folded, b);
    }
}
