// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Uniform Resources (BC-UR) for QR transport.
//!
//! This module provides:
//! - Bytewords minimal encoding with CRC-32 checksums
//! - A CBOR subset reader/writer
//! - Fountain-coded multi-part framing (encoder and decoder)
//! - Parsing of scanned `ur:` strings

pub mod bytewords;
pub mod cbor;
pub mod crc32;
pub mod decoder;
pub mod encoder;
pub mod fountain;
pub mod fragment;

pub use cbor::{CborError, CborValue};
pub use decoder::{ReconstructedResource, UrDecoder};
pub use encoder::UrEncoder;
pub use fragment::{has_ur_scheme, Fragment, SequenceId, UR_SCHEME};

/// Errors raised while parsing or reassembling URs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrError {
    #[error("Not a UR string")]
    InvalidScheme,

    #[error("Invalid UR type: {0}")]
    InvalidType(String),

    #[error("Invalid UR sequence: {0}")]
    InvalidSequence(String),

    #[error("Invalid bytewords: {0}")]
    InvalidBytewords(String),

    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Invalid CBOR: {0}")]
    Cbor(#[from] CborError),

    #[error("Invalid multi-part fragment: {0}")]
    InvalidPart(String),

    #[error("Fragment does not belong to this transfer: {0}")]
    InconsistentPart(String),

    #[error("UR type changed from {expected} to {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("UR transfer is not complete")]
    NotComplete,

    #[error("Cannot encode an empty message")]
    EmptyMessage,
}
