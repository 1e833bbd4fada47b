// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stateful UR decoder: receive parts, report progress, produce the result.

use std::collections::BTreeSet;

use super::bytewords;
use super::fountain::{FountainDecoder, FountainPart};
use super::fragment::Fragment;
use super::UrError;

/// A fully reassembled UR: type tag plus the CBOR message bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedResource {
    pub ur_type: String,
    pub payload: Vec<u8>,
}

impl ReconstructedResource {
    /// Render as `ur:<type>/<lowercase hex>`.
    pub fn to_resource_string(&self) -> String {
        format!("ur:{}/{}", self.ur_type, hex::encode(&self.payload))
    }
}

impl std::fmt::Display for ReconstructedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_resource_string())
    }
}

/// Decoder for one multi-part UR transfer.
#[derive(Debug, Default)]
pub struct UrDecoder {
    ur_type: Option<String>,
    fountain: FountainDecoder,
}

impl UrDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a single-part UR without any reassembly state.
    pub fn decode_single(fragment: &Fragment) -> Result<ReconstructedResource, UrError> {
        if fragment.is_multi_part() {
            return Err(UrError::InvalidSequence(
                "expected a single-part UR".to_string(),
            ));
        }
        Ok(ReconstructedResource {
            ur_type: fragment.ur_type.clone(),
            payload: bytewords::decode_minimal(&fragment.body)?,
        })
    }

    /// Feed one multi-part fragment.
    pub fn receive_part(&mut self, fragment: &Fragment) -> Result<(), UrError> {
        let sequence = fragment.sequence.ok_or_else(|| {
            UrError::InvalidSequence("expected a multi-part UR".to_string())
        })?;

        if let Some(expected) = &self.ur_type {
            if expected != &fragment.ur_type {
                return Err(UrError::TypeMismatch {
                    expected: expected.clone(),
                    actual: fragment.ur_type.clone(),
                });
            }
        }

        let cbor = bytewords::decode_minimal(&fragment.body)?;
        let part = FountainPart::from_cbor(&cbor)?;
        if part.seq_num != sequence.seq_num || part.seq_len != sequence.total {
            return Err(UrError::InvalidSequence(format!(
                "path says {}-{} but body says {}-{}",
                sequence.seq_num, sequence.total, part.seq_num, part.seq_len
            )));
        }

        self.fountain.receive(&part)?;
        self.ur_type.get_or_insert_with(|| fragment.ur_type.clone());
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.fountain.is_complete()
    }

    pub fn received_indexes(&self) -> &BTreeSet<usize> {
        self.fountain.received_indexes()
    }

    pub fn expected_part_count(&self) -> Option<usize> {
        self.fountain.expected_part_count()
    }

    /// The reassembled resource, once complete.
    pub fn result(&self) -> Result<ReconstructedResource, UrError> {
        let message = match self.fountain.result() {
            None => return Err(UrError::NotComplete),
            Some(Err(e)) => return Err(e.clone()),
            Some(Ok(message)) => message,
        };
        let ur_type = self.ur_type.clone().ok_or(UrError::NotComplete)?;
        Ok(ReconstructedResource {
            ur_type,
            payload: message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ur::UrEncoder;

    #[test]
    fn single_part_decodes_directly() {
        let ur = UrEncoder::encode_single("bytes", &[0x43, 1, 2, 3]).unwrap();
        let fragment = Fragment::parse(&ur).unwrap();
        let resource = UrDecoder::decode_single(&fragment).unwrap();
        assert_eq!(resource.ur_type, "bytes");
        assert_eq!(resource.payload, vec![0x43, 1, 2, 3]);
        assert_eq!(resource.to_resource_string(), "ur:bytes/43010203");
    }

    #[test]
    fn reassembles_multi_part() {
        let message: Vec<u8> = (0..=255u8).cycle().take(700).collect();
        let mut encoder = UrEncoder::new("bytes", &message, 100).unwrap();
        let mut decoder = UrDecoder::new();

        for _ in 0..encoder.seq_len() {
            let part = encoder.next_part();
            decoder.receive_part(&Fragment::parse(&part).unwrap()).unwrap();
        }

        assert!(decoder.is_complete());
        assert_eq!(decoder.received_indexes().len(), encoder.seq_len());
        assert_eq!(decoder.result().unwrap().payload, message);
    }

    #[test]
    fn result_before_completion_is_an_error() {
        let decoder = UrDecoder::new();
        assert_eq!(decoder.result(), Err(UrError::NotComplete));
    }

    #[test]
    fn rejects_type_switch_mid_transfer() {
        let message = vec![7u8; 300];
        let mut bytes = UrEncoder::new("bytes", &message, 100).unwrap();
        let mut other = UrEncoder::new("xrp-sign", &message, 100).unwrap();

        let mut decoder = UrDecoder::new();
        decoder
            .receive_part(&Fragment::parse(&bytes.next_part()).unwrap())
            .unwrap();
        let err = decoder
            .receive_part(&Fragment::parse(&other.next_part()).unwrap())
            .unwrap_err();
        assert!(matches!(err, UrError::TypeMismatch { .. }));
    }

    #[test]
    fn rejects_path_body_sequence_disagreement() {
        let mut encoder = UrEncoder::new("bytes", &[9u8; 300], 100).unwrap();
        let part = encoder.next_part();
        let tampered = part.replacen("/1-3/", "/2-3/", 1);

        let mut decoder = UrDecoder::new();
        let err = decoder
            .receive_part(&Fragment::parse(&tampered).unwrap())
            .unwrap_err();
        assert!(matches!(err, UrError::InvalidSequence(_)));
        assert!(decoder.received_indexes().is_empty());
    }
}
