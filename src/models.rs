// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and the
//! OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Sessions**: one air-gapped signing attempt (sign request out, scanned
//!   fragments in, submission result)
//! - **Transactions**: stateless binary codec helpers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::scan::ScanProgress;
use crate::signing::FlowState;
use crate::xrpl::Network;

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Target network (defaults to `testnet`)
    #[serde(default)]
    pub network: Network,
    /// Unsigned transaction JSON. Required when the device only returns a
    /// signature; it is also rendered as the sign request.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub unsigned_tx: Option<Value>,
}

/// Snapshot of a signing session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub network: Network,
    pub state: FlowState,
    /// Reassembly progress of the device response, once scanning started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ScanProgress>,
    /// Animated QR frames (`ur:bytes/...`) to show to the device
    pub sign_request: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Message of the last failed attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitFragmentRequest {
    /// Raw text decoded from one QR frame
    pub fragment: String,
}

/// What the service did with a scanned fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FragmentStatus {
    /// Not a UR string
    Ignored,
    /// Already received
    Duplicate,
    /// Malformed or from another transfer; keep scanning
    Rejected,
    /// Accepted, more fragments needed
    InProgress,
    /// Reassembled, merged and accepted by the ledger
    Submitted,
    /// All parts arrived but the payload was invalid; scanning restarted
    ReconstructionFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FragmentResponse {
    pub status: FragmentStatus,
    /// Reason for `rejected` and `reconstruction_failed`, or a note when the
    /// session ended while its transaction was being submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub session: SessionResponse,
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncodeTransactionRequest {
    #[schema(value_type = Object)]
    pub transaction: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncodeTransactionResponse {
    /// Uppercase hex of the canonical binary form
    pub tx_blob: String,
    /// Transaction ID (only meaningful for signed transactions)
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecodeTransactionRequest {
    pub tx_blob: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecodeTransactionResponse {
    #[schema(value_type = Object)]
    pub transaction: Value,
    pub hash: String,
}
