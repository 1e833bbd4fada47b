// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! UR encoder used to render sign requests as (animated) QR codes.

use super::bytewords;
use super::fountain::FountainEncoder;
use super::UrError;

/// Produces the QR strings for one message.
pub struct UrEncoder {
    ur_type: String,
    fountain: FountainEncoder,
    single: Option<String>,
}

impl UrEncoder {
    /// Encoder for `message`, split into fragments of at most `max_fragment_len` bytes.
    pub fn new(ur_type: &str, message: &[u8], max_fragment_len: usize) -> Result<Self, UrError> {
        let fountain = FountainEncoder::new(message, max_fragment_len)?;
        let single = fountain
            .is_single_part()
            .then(|| format!("ur:{ur_type}/{}", bytewords::encode_minimal(message)));
        Ok(Self {
            ur_type: ur_type.to_string(),
            fountain,
            single,
        })
    }

    /// Encode `message` as one single-part UR string.
    pub fn encode_single(ur_type: &str, message: &[u8]) -> Result<String, UrError> {
        if message.is_empty() {
            return Err(UrError::EmptyMessage);
        }
        Ok(format!("ur:{ur_type}/{}", bytewords::encode_minimal(message)))
    }

    pub fn seq_len(&self) -> usize {
        self.fountain.seq_len()
    }

    pub fn is_single_part(&self) -> bool {
        self.single.is_some()
    }

    /// Next QR string. Single-part messages repeat the same string forever.
    pub fn next_part(&mut self) -> String {
        if let Some(single) = &self.single {
            return single.clone();
        }
        let part = self.fountain.next_part();
        format!(
            "ur:{}/{}-{}/{}",
            self.ur_type,
            part.seq_num,
            part.seq_len,
            bytewords::encode_minimal(&part.to_cbor())
        )
    }

    /// One full pass over the simple parts.
    pub fn first_pass(&mut self) -> Vec<String> {
        (0..self.seq_len()).map(|_| self.next_part()).collect()
    }
}
