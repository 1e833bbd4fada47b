// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Merging a device response with the unsigned transaction.
//!
//! Devices either return the complete signed blob or only the signature.
//! A payload longer than [`SIGNED_BLOB_MIN_LEN`] characters that starts with
//! the `TransactionType` field header (`12`) followed by a known type code is
//! taken as a signed blob. Everything else is treated as a bare signature and
//! spliced into a copy of the unsigned transaction as `TxnSignature`, provided
//! it is no longer than [`MAX_SIGNATURE_HEX_LEN`].

use serde_json::Value;

use super::SigningError;
use crate::xrpl::codec::{decode_transaction_hex, encode_transaction_hex, CodecError};
use crate::xrpl::definitions::transaction_type_name;

/// Payloads must be strictly longer than this to count as a signed blob.
pub const SIGNED_BLOB_MIN_LEN: usize = 200;

/// Hex of the `TransactionType` field header.
const TRANSACTION_TYPE_HEADER: &str = "12";
const SIGNATURE_FIELD: &str = "TxnSignature";

/// Longest bare signature accepted: a 72-byte DER secp256k1 signature.
/// Ed25519 signatures are 64 bytes.
pub const MAX_SIGNATURE_HEX_LEN: usize = 144;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A complete, signed transaction blob.
    SignedBlob,
    /// A bare signature to splice into the unsigned transaction.
    Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub kind: PayloadKind,
    /// Uppercase hex of the signed transaction.
    pub tx_blob: String,
}

/// Decide how a payload should be used.
pub fn classify_payload(payload: &str) -> PayloadKind {
    let payload = payload.trim();
    if payload.len() <= SIGNED_BLOB_MIN_LEN || !payload.starts_with(TRANSACTION_TYPE_HEADER) {
        return PayloadKind::Signature;
    }
    let known_type = payload
        .get(2..6)
        .and_then(|code| u16::from_str_radix(code, 16).ok())
        .and_then(transaction_type_name)
        .is_some();
    if known_type {
        PayloadKind::SignedBlob
    } else {
        PayloadKind::Signature
    }
}

/// Produce the signed blob for submission.
///
/// `unsigned_tx` is only read; the signature is spliced into a clone.
pub fn merge_signature(
    payload: &str,
    unsigned_tx: Option<&Value>,
) -> Result<MergeOutcome, SigningError> {
    let payload = payload.trim().to_uppercase();

    match classify_payload(&payload) {
        PayloadKind::SignedBlob => {
            validate_signed_blob(&payload)?;
            Ok(MergeOutcome {
                kind: PayloadKind::SignedBlob,
                tx_blob: payload,
            })
        }
        PayloadKind::Signature => {
            let template = unsigned_tx.ok_or(SigningError::MissingUnsignedTransaction)?;
            if payload.is_empty() || payload.len() % 2 != 0 || hex::decode(&payload).is_err() {
                return Err(SigningError::InvalidSignature(
                    "signature must be an even-length hex string".to_string(),
                ));
            }
            if payload.len() > MAX_SIGNATURE_HEX_LEN {
                return Err(SigningError::InvalidSignature(format!(
                    "{} hex characters is longer than any signature ({MAX_SIGNATURE_HEX_LEN})",
                    payload.len()
                )));
            }

            let mut signed = template.clone();
            let fields = signed
                .as_object_mut()
                .ok_or(SigningError::Codec(CodecError::NotAnObject))?;
            fields.insert(SIGNATURE_FIELD.to_string(), Value::String(payload));

            Ok(MergeOutcome {
                kind: PayloadKind::Signature,
                tx_blob: encode_transaction_hex(&signed)?,
            })
        }
    }
}

/// A device-returned blob must decode and carry a signature.
fn validate_signed_blob(blob: &str) -> Result<(), SigningError> {
    if blob.len() % 2 != 0 {
        return Err(SigningError::InvalidSignedBlob(
            "odd number of hex digits".to_string(),
        ));
    }
    let decoded =
        decode_transaction_hex(blob).map_err(|e| SigningError::InvalidSignedBlob(e.to_string()))?;
    if decoded.get(SIGNATURE_FIELD).is_none() {
        return Err(SigningError::InvalidSignedBlob(
            "blob carries no TxnSignature".to_string(),
        ));
    }
    Ok(())
}
