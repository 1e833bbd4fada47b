// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Fountain Codes
//!
//! Multi-part URs split a message into `seq_len` equal fragments. Parts with
//! `seq_num <= seq_len` carry one fragment each ("simple" parts). Parts past
//! that carry the XOR of a pseudo-randomly chosen subset of fragments
//! ("mixed" parts), so a scanner that missed a frame can still finish without
//! waiting for the animation to loop.
//!
//! The fragment subset for a sequence number is derived deterministically:
//!
//! 1. seed Xoshiro256** with `SHA-256(seq_num_be32 || checksum_be32)`;
//! 2. pick a degree `d` with probability proportional to `1/d`
//!    (Vose alias sampler);
//! 3. shuffle `0..seq_len` and keep the first `d` indexes.
//!
//! Encoder and decoder share this derivation, which is what lets the decoder
//! know which fragments a mixed part covers.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use sha2::{Digest, Sha256};

use super::cbor::{self, CborValue};
use super::crc32::crc32;
use super::UrError;

/// Largest message the decoder will reassemble.
pub const MAX_MESSAGE_LEN: usize = 256 * 1024;

/// Most fragments a message may be split into.
pub const MAX_SEQ_LEN: usize = 1024;

// =============================================================================
// Pseudo-random fragment selection
// =============================================================================

struct Xoshiro256 {
    s: [u64; 4],
}

impl Xoshiro256 {
    fn from_seed_bytes(seed: &[u8]) -> Self {
        let hash = Sha256::digest(seed);
        let mut s = [0u64; 4];
        for (i, word) in s.iter_mut().enumerate() {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&hash[i * 8..i * 8 + 8]);
            *word = u64::from_be_bytes(bytes);
        }
        Self { s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = self.s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    fn next_double(&mut self) -> f64 {
        self.next_u64() as f64 / (u64::MAX as f64 + 1.0)
    }

    fn next_int(&mut self, low: usize, high: usize) -> usize {
        (self.next_double() * (high - low + 1) as f64) as usize + low
    }
}

/// Vose's alias method over a fixed set of weights.
struct RandomSampler {
    probs: Vec<f64>,
    aliases: Vec<usize>,
}

impl RandomSampler {
    fn new(weights: &[f64]) -> Self {
        let n = weights.len();
        let sum: f64 = weights.iter().sum();
        let mut scaled: Vec<f64> = weights.iter().map(|w| w * n as f64 / sum).collect();

        let mut small = Vec::new();
        let mut large = Vec::new();
        for i in (0..n).rev() {
            if scaled[i] < 1.0 {
                small.push(i);
            } else {
                large.push(i);
            }
        }

        let mut probs = vec![0.0; n];
        let mut aliases = vec![0usize; n];

        while let (Some(&a), Some(&g)) = (small.last(), large.last()) {
            small.pop();
            large.pop();
            probs[a] = scaled[a];
            aliases[a] = g;
            scaled[g] += scaled[a] - 1.0;
            if scaled[g] < 1.0 {
                small.push(g);
            } else {
                large.push(g);
            }
        }

        while let Some(g) = large.pop() {
            probs[g] = 1.0;
        }
        while let Some(a) = small.pop() {
            probs[a] = 1.0;
        }

        Self { probs, aliases }
    }

    fn next(&self, rng: &mut Xoshiro256) -> usize {
        let r1 = rng.next_double();
        let r2 = rng.next_double();
        let i = (self.probs.len() as f64 * r1) as usize;
        if r2 < self.probs[i] {
            i
        } else {
            self.aliases[i]
        }
    }
}

fn choose_degree(seq_len: usize, rng: &mut Xoshiro256) -> usize {
    let weights: Vec<f64> = (1..=seq_len).map(|i| 1.0 / i as f64).collect();
    RandomSampler::new(&weights).next(rng) + 1
}

fn shuffle(mut remaining: Vec<usize>, rng: &mut Xoshiro256) -> Vec<usize> {
    let mut result = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let index = rng.next_int(0, remaining.len() - 1);
        result.push(remaining.remove(index));
    }
    result
}

/// Fragment indexes (zero-based) covered by part `seq_num`.
pub fn choose_fragments(seq_num: u32, seq_len: usize, checksum: u32) -> BTreeSet<usize> {
    if seq_num as usize <= seq_len {
        return BTreeSet::from([seq_num as usize - 1]);
    }

    let mut seed = [0u8; 8];
    seed[..4].copy_from_slice(&seq_num.to_be_bytes());
    seed[4..].copy_from_slice(&checksum.to_be_bytes());
    let mut rng = Xoshiro256::from_seed_bytes(&seed);

    let degree = choose_degree(seq_len, &mut rng);
    let shuffled = shuffle((0..seq_len).collect(), &mut rng);
    shuffled.into_iter().take(degree).collect()
}

fn xor_into(target: &mut [u8], other: &[u8]) {
    for (a, b) in target.iter_mut().zip(other) {
        *a ^= b;
    }
}

// =============================================================================
// Wire part
// =============================================================================

/// One multi-part UR body: CBOR `[seq_num, seq_len, message_len, checksum, data]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FountainPart {
    pub seq_num: u32,
    pub seq_len: usize,
    pub message_len: usize,
    pub checksum: u32,
    pub data: Vec<u8>,
}

impl FountainPart {
    pub fn to_cbor(&self) -> Vec<u8> {
        cbor::encode(&CborValue::Array(vec![
            CborValue::Unsigned(self.seq_num as u64),
            CborValue::Unsigned(self.seq_len as u64),
            CborValue::Unsigned(self.message_len as u64),
            CborValue::Unsigned(self.checksum as u64),
            CborValue::Bytes(self.data.clone()),
        ]))
    }

    pub fn from_cbor(data: &[u8]) -> Result<Self, UrError> {
        let value = cbor::decode(data)?;
        let items = match value {
            CborValue::Array(items) if items.len() == 5 => items,
            _ => {
                return Err(UrError::InvalidPart(
                    "expected a five element array".to_string(),
                ))
            }
        };

        let uint = |i: usize, name: &str| {
            items[i]
                .as_unsigned()
                .ok_or_else(|| UrError::InvalidPart(format!("{name} must be an unsigned integer")))
        };

        let seq_num = u32::try_from(uint(0, "seq_num")?)
            .map_err(|_| UrError::InvalidPart("seq_num out of range".to_string()))?;
        let seq_len = usize::try_from(uint(1, "seq_len")?)
            .map_err(|_| UrError::InvalidPart("seq_len out of range".to_string()))?;
        let message_len = usize::try_from(uint(2, "message_len")?)
            .map_err(|_| UrError::InvalidPart("message_len out of range".to_string()))?;
        let checksum = u32::try_from(uint(3, "checksum")?)
            .map_err(|_| UrError::InvalidPart("checksum out of range".to_string()))?;
        let data = items[4]
            .as_bytes()
            .ok_or_else(|| UrError::InvalidPart("data must be a byte string".to_string()))?
            .to_vec();

        if seq_num == 0 || seq_len == 0 || message_len == 0 || data.is_empty() {
            return Err(UrError::InvalidPart("zero-valued header field".to_string()));
        }

        Ok(Self {
            seq_num,
            seq_len,
            message_len,
            checksum,
            data,
        })
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Splits a message into fountain parts.
pub struct FountainEncoder {
    message_len: usize,
    checksum: u32,
    fragments: Vec<Vec<u8>>,
    seq_num: u32,
}

impl FountainEncoder {
    pub fn new(message: &[u8], max_fragment_len: usize) -> Result<Self, UrError> {
        if message.is_empty() {
            return Err(UrError::EmptyMessage);
        }
        if max_fragment_len == 0 {
            return Err(UrError::InvalidPart(
                "fragment length must be positive".to_string(),
            ));
        }

        let fragment_count = message.len().div_ceil(max_fragment_len);
        let fragment_len = message.len().div_ceil(fragment_count);

        let mut padded = message.to_vec();
        padded.resize(fragment_len * fragment_count, 0);
        let fragments = padded.chunks(fragment_len).map(<[u8]>::to_vec).collect();

        Ok(Self {
            message_len: message.len(),
            checksum: crc32(message),
            fragments,
            seq_num: 0,
        })
    }

    pub fn seq_len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_single_part(&self) -> bool {
        self.fragments.len() == 1
    }

    pub fn next_part(&mut self) -> FountainPart {
        self.seq_num = self.seq_num.wrapping_add(1).max(1);
        let indexes = choose_fragments(self.seq_num, self.seq_len(), self.checksum);

        let mut data = vec![0u8; self.fragments[0].len()];
        for index in indexes {
            xor_into(&mut data, &self.fragments[index]);
        }

        FountainPart {
            seq_num: self.seq_num,
            seq_len: self.seq_len(),
            message_len: self.message_len,
            checksum: self.checksum,
            data,
        }
    }
}

// =============================================================================
// Decoder
// =============================================================================

#[derive(Debug, Clone)]
struct IndexedPart {
    indexes: BTreeSet<usize>,
    data: Vec<u8>,
}

impl IndexedPart {
    fn is_simple(&self) -> bool {
        self.indexes.len() == 1
    }

    /// XOR `other` out of `self` when `other` covers a subset of our fragments.
    fn reduce_by(&mut self, other: &IndexedPart) {
        if other.indexes.is_empty() || !other.indexes.is_subset(&self.indexes) {
            return;
        }
        self.indexes = self.indexes.difference(&other.indexes).copied().collect();
        xor_into(&mut self.data, &other.data);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartShape {
    seq_len: usize,
    message_len: usize,
    checksum: u32,
    fragment_len: usize,
}

/// Reassembles a message from fountain parts in any order.
#[derive(Debug, Default)]
pub struct FountainDecoder {
    shape: Option<PartShape>,
    received: BTreeSet<usize>,
    simple: BTreeMap<usize, Vec<u8>>,
    mixed: BTreeMap<Vec<usize>, IndexedPart>,
    queue: VecDeque<IndexedPart>,
    result: Option<Result<Vec<u8>, UrError>>,
}

impl FountainDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one part. Parts after completion are ignored.
    pub fn receive(&mut self, part: &FountainPart) -> Result<(), UrError> {
        if self.is_complete() {
            return Ok(());
        }

        let shape = PartShape {
            seq_len: part.seq_len,
            message_len: part.message_len,
            checksum: part.checksum,
            fragment_len: part.data.len(),
        };
        match self.shape {
            None => {
                if shape.message_len > MAX_MESSAGE_LEN
                    || shape.seq_len > MAX_SEQ_LEN
                    || shape.seq_len > shape.message_len
                {
                    return Err(UrError::InconsistentPart(format!(
                        "unsupported message size {} in {} parts",
                        shape.message_len, shape.seq_len
                    )));
                }
                // Every part carries ceil(message_len / seq_len) bytes.
                if shape.fragment_len != shape.message_len.div_ceil(shape.seq_len) {
                    return Err(UrError::InconsistentPart(format!(
                        "fragment length {} does not split {} bytes into {} parts",
                        shape.fragment_len, shape.message_len, shape.seq_len
                    )));
                }
                self.shape = Some(shape);
            }
            Some(expected) if expected != shape => {
                return Err(UrError::InconsistentPart(format!(
                    "part {} does not match the parts already received",
                    part.seq_num
                )));
            }
            Some(_) => {}
        }

        self.queue.push_back(IndexedPart {
            indexes: choose_fragments(part.seq_num, shape.seq_len, shape.checksum),
            data: part.data.clone(),
        });

        while !self.is_complete() {
            let Some(next) = self.queue.pop_front() else {
                break;
            };
            if next.is_simple() {
                self.process_simple(next);
            } else {
                self.process_mixed(next);
            }
        }
        self.queue.clear();

        Ok(())
    }

    fn process_simple(&mut self, part: IndexedPart) {
        let Some(&index) = part.indexes.iter().next() else {
            return;
        };
        if self.received.contains(&index) {
            return;
        }

        self.simple.insert(index, part.data.clone());
        self.received.insert(index);

        let Some(shape) = self.shape else {
            return;
        };
        if self.received.len() == shape.seq_len {
            self.result = Some(self.join_message(shape));
            return;
        }

        self.reduce_mixed_by(&part);
    }

    fn process_mixed(&mut self, part: IndexedPart) {
        let key: Vec<usize> = part.indexes.iter().copied().collect();
        if self.mixed.contains_key(&key) {
            return;
        }

        let mut reduced = part;
        for (&index, data) in &self.simple {
            reduced.reduce_by(&IndexedPart {
                indexes: BTreeSet::from([index]),
                data: data.clone(),
            });
        }
        for other in self.mixed.values() {
            reduced.reduce_by(other);
        }

        if reduced.indexes.is_empty() {
            return;
        }
        if reduced.is_simple() {
            self.queue.push_back(reduced);
            return;
        }

        self.reduce_mixed_by(&reduced);
        let key = reduced.indexes.iter().copied().collect();
        self.mixed.insert(key, reduced);
    }

    fn reduce_mixed_by(&mut self, by: &IndexedPart) {
        let existing = std::mem::take(&mut self.mixed);
        for (_, mut part) in existing {
            part.reduce_by(by);
            if part.indexes.is_empty() {
                continue;
            }
            if part.is_simple() {
                self.queue.push_back(part);
            } else {
                let key = part.indexes.iter().copied().collect();
                self.mixed.insert(key, part);
            }
        }
    }

    fn join_message(&self, shape: PartShape) -> Result<Vec<u8>, UrError> {
        let mut message = Vec::with_capacity(shape.seq_len * shape.fragment_len);
        for fragment in self.simple.values() {
            message.extend_from_slice(fragment);
        }
        message.truncate(shape.message_len);

        let actual = crc32(&message);
        if actual != shape.checksum {
            return Err(UrError::ChecksumMismatch {
                expected: shape.checksum,
                actual,
            });
        }
        Ok(message)
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Zero-based indexes of fragments recovered so far.
    pub fn received_indexes(&self) -> &BTreeSet<usize> {
        &self.received
    }

    pub fn expected_part_count(&self) -> Option<usize> {
        self.shape.map(|s| s.seq_len)
    }

    pub fn result(&self) -> Option<&Result<Vec<u8>, UrError>> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn simple_parts_choose_their_own_index() {
        for seq_num in 1..=5 {
            let chosen = choose_fragments(seq_num, 5, 0xDEAD_BEEF);
            assert_eq!(chosen, BTreeSet::from([seq_num as usize - 1]));
        }
    }

    #[test]
    fn mixed_part_choice_is_deterministic_and_in_range() {
        for seq_num in 6..40 {
            let a = choose_fragments(seq_num, 5, 0x1234_5678);
            let b = choose_fragments(seq_num, 5, 0x1234_5678);
            assert_eq!(a, b);
            assert!(!a.is_empty());
            assert!(a.iter().all(|&i| i < 5));
        }
    }

    #[test]
    fn sampler_with_single_weight_always_returns_zero() {
        let sampler = RandomSampler::new(&[1.0]);
        let mut rng = Xoshiro256::from_seed_bytes(b"Wolf");
        for _ in 0..10 {
            assert_eq!(sampler.next(&mut rng), 0);
        }
    }

    #[test]
    fn part_cbor_round_trip() {
        let part = FountainPart {
            seq_num: 3,
            seq_len: 9,
            message_len: 256,
            checksum: 0xCAFE_BABE,
            data: vec![1, 2, 3],
        };
        assert_eq!(FountainPart::from_cbor(&part.to_cbor()).unwrap(), part);
    }

    #[test]
    fn part_with_zero_header_is_rejected() {
        let part = FountainPart {
            seq_num: 0,
            seq_len: 9,
            message_len: 256,
            checksum: 1,
            data: vec![1],
        };
        assert!(matches!(
            FountainPart::from_cbor(&part.to_cbor()),
            Err(UrError::InvalidPart(_))
        ));
    }

    #[test]
    fn decodes_simple_parts_in_reverse_order() {
        let msg = message(500);
        let mut encoder = FountainEncoder::new(&msg, 60).unwrap();
        let parts: Vec<_> = (0..encoder.seq_len()).map(|_| encoder.next_part()).collect();

        let mut decoder = FountainDecoder::new();
        for part in parts.iter().rev() {
            decoder.receive(part).unwrap();
        }

        assert!(decoder.is_complete());
        assert_eq!(decoder.result().unwrap().as_ref().unwrap(), &msg);
        assert_eq!(decoder.received_indexes().len(), encoder.seq_len());
    }

    #[test]
    fn recovers_missing_simple_parts_from_mixed_parts() {
        let msg = message(1024);
        let mut encoder = FountainEncoder::new(&msg, 100).unwrap();
        let seq_len = encoder.seq_len();

        let mut decoder = FountainDecoder::new();
        // Skip every third simple part, then keep streaming mixed parts.
        for _ in 0..seq_len * 10 {
            let part = encoder.next_part();
            if part.seq_num as usize <= seq_len && part.seq_num % 3 == 0 {
                continue;
            }
            decoder.receive(&part).unwrap();
            if decoder.is_complete() {
                break;
            }
        }

        assert!(decoder.is_complete());
        assert_eq!(decoder.result().unwrap().as_ref().unwrap(), &msg);
    }

    #[test]
    fn rejects_part_from_a_different_message() {
        let mut first = FountainEncoder::new(&message(300), 50).unwrap();
        let mut second = FountainEncoder::new(&message(400), 50).unwrap();

        let mut decoder = FountainDecoder::new();
        decoder.receive(&first.next_part()).unwrap();
        assert!(matches!(
            decoder.receive(&second.next_part()),
            Err(UrError::InconsistentPart(_))
        ));
    }

    #[test]
    fn duplicate_simple_part_does_not_change_state() {
        let mut encoder = FountainEncoder::new(&message(300), 100).unwrap();
        let part = encoder.next_part();

        let mut decoder = FountainDecoder::new();
        decoder.receive(&part).unwrap();
        decoder.receive(&part).unwrap();
        assert_eq!(decoder.received_indexes().len(), 1);
        assert!(!decoder.is_complete());
    }

    #[test]
    fn corrupted_fragment_fails_message_checksum() {
        let msg = message(200);
        let mut encoder = FountainEncoder::new(&msg, 100).unwrap();
        let mut first = encoder.next_part();
        let second = encoder.next_part();
        first.data[0] ^= 0xFF;

        let mut decoder = FountainDecoder::new();
        decoder.receive(&first).unwrap();
        decoder.receive(&second).unwrap();
        assert!(matches!(
            decoder.result(),
            Some(Err(UrError::ChecksumMismatch { .. }))
        ));
    }

    fn part(seq_num: u32, seq_len: usize, message_len: usize, data_len: usize) -> FountainPart {
        FountainPart {
            seq_num,
            seq_len,
            message_len,
            checksum: 0x0BAD_F00D,
            data: vec![0xA5; data_len],
        }
    }

    #[test]
    fn rejects_oversized_or_misshapen_headers() {
        let oversized = [
            part(2_000, 1_500, 1_500, 1),
            part(1, 1, MAX_MESSAGE_LEN + 1, MAX_MESSAGE_LEN + 1),
            part((1 << 20) + 7, 1 << 20, 1 << 20, 1),
            // Fragment length that the encoder would never produce.
            part(1, 4, 400, 1),
            part(1, 4, 400, 101),
        ];
        for bad in &oversized {
            let mut decoder = FountainDecoder::new();
            assert!(
                matches!(decoder.receive(bad), Err(UrError::InconsistentPart(_))),
                "accepted {bad:?}"
            );
            assert!(decoder.received_indexes().is_empty());
        }

        let mut decoder = FountainDecoder::new();
        decoder.receive(&part(5, 4, 399, 100)).unwrap();
        decoder.receive(&part(1, MAX_SEQ_LEN, MAX_SEQ_LEN, 1)).unwrap_err();
    }
}
