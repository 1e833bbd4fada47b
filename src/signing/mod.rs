// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Turning a scanned signing response into a broadcast transaction.
//!
//! 1. [`payload::extract_tx_payload`] pulls the signature or signed blob out of
//!    the reconstructed resource.
//! 2. [`merge::merge_signature`] either accepts a full signed blob or splices a
//!    bare signature into the unsigned transaction.
//! 3. [`flow::SigningFlow`] drives submission and the
//!    `qr-display -> submitting -> complete` state machine.

pub mod flow;
pub mod merge;
pub mod payload;

pub use flow::{merge_and_submit, FlowState, SigningFlow, SubmittedTransaction};
pub use merge::{classify_payload, merge_signature, MergeOutcome, PayloadKind};
pub use payload::extract_tx_payload;

use crate::xrpl::CodecError;

/// Errors raised between reconstruction and a positive engine result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("No transaction signature found in the scanned response")]
    NoPayload,

    #[error("Unsigned transaction is required to apply a bare signature")]
    MissingUnsignedTransaction,

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid signed transaction blob: {0}")]
    InvalidSignedBlob(String),

    #[error("Failed to encode signed transaction: {0}")]
    Codec(#[from] CodecError),

    /// The node answered with a non-positive engine result.
    #[error("{message}")]
    Rejected {
        engine_result: String,
        message: String,
    },

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Cannot {action} while the flow is {state}")]
    InvalidTransition {
        state: FlowState,
        action: &'static str,
    },
}
