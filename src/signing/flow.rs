// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing flow state machine.
//!
//! ```text
//! qr-display ──begin_submit──▶ submitting ──complete──▶ complete
//!      ▲                            │
//!      └────────────fail────────────┘
//! ```
//!
//! `complete` is terminal. The transition methods are split so callers that
//! hold the flow behind a lock can release it while the network call runs;
//! [`SigningFlow::submit`] strings them together for single-owner use.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::merge::{merge_signature, PayloadKind};
use super::SigningError;
use crate::xrpl::{transaction_hash, TxSubmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FlowState {
    QrDisplay,
    Submitting,
    Complete,
}

impl FlowState {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowState::QrDisplay => "qr-display",
            FlowState::Submitting => "submitting",
            FlowState::Complete => "complete",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction accepted by the ledger node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub tx_hash: String,
    pub tx_blob: String,
    pub kind: PayloadKind,
    pub engine_result: String,
}

/// Merge the device payload and broadcast the result.
pub async fn merge_and_submit(
    payload: &str,
    unsigned_tx: Option<&Value>,
    submitter: &dyn TxSubmitter,
) -> Result<SubmittedTransaction, SigningError> {
    let merged = merge_signature(payload, unsigned_tx)?;

    let result = submitter
        .submit(&merged.tx_blob)
        .await
        .map_err(|e| SigningError::Submission(e.to_string()))?;

    if !result.success {
        tracing::warn!(
            engine_result = %result.engine_result,
            message = %result.engine_result_message,
            "Ledger rejected transaction"
        );
        return Err(SigningError::Rejected {
            message: result.failure_reason(),
            engine_result: result.engine_result,
        });
    }

    let tx_hash = match result.tx_hash {
        Some(hash) => hash,
        None => {
            let bytes = hex::decode(&merged.tx_blob)
                .map_err(|e| SigningError::InvalidSignedBlob(e.to_string()))?;
            transaction_hash(&bytes)
        }
    };

    Ok(SubmittedTransaction {
        tx_hash,
        tx_blob: merged.tx_blob,
        kind: merged.kind,
        engine_result: result.engine_result,
    })
}

/// State of one signing attempt.
#[derive(Debug, Clone)]
pub struct SigningFlow {
    state: FlowState,
    unsigned_tx: Option<Value>,
    tx_hash: Option<String>,
    last_error: Option<String>,
}

impl SigningFlow {
    pub fn new(unsigned_tx: Option<Value>) -> Self {
        Self {
            state: FlowState::QrDisplay,
            unsigned_tx,
            tx_hash: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn unsigned_tx(&self) -> Option<&Value> {
        self.unsigned_tx.as_ref()
    }

    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `qr-display -> submitting`.
    pub fn begin_submit(&mut self) -> Result<(), SigningError> {
        self.require(FlowState::QrDisplay, "submit")?;
        self.state = FlowState::Submitting;
        self.last_error = None;
        Ok(())
    }

    /// `submitting -> qr-display`, keeping the error for display.
    pub fn fail(&mut self, error: &SigningError) {
        if self.state != FlowState::Submitting {
            return;
        }
        self.state = FlowState::QrDisplay;
        self.last_error = Some(error.to_string());
    }

    /// Store the hash of an accepted transaction while the success screen shows.
    pub fn record_success(&mut self, tx_hash: &str) -> Result<(), SigningError> {
        self.require(FlowState::Submitting, "record a result")?;
        self.tx_hash = Some(tx_hash.to_string());
        Ok(())
    }

    /// `submitting -> complete`.
    pub fn complete(&mut self) -> Result<(), SigningError> {
        self.require(FlowState::Submitting, "complete")?;
        if self.tx_hash.is_none() {
            return Err(SigningError::InvalidTransition {
                state: self.state,
                action: "complete without a transaction hash",
            });
        }
        self.state = FlowState::Complete;
        Ok(())
    }

    /// Run the whole submission for a scanned payload.
    ///
    /// On success `on_complete` receives the transaction hash, then the flow
    /// waits `display_delay` before entering `complete`. Any failure puts the
    /// flow back in `qr-display` with [`last_error`](Self::last_error) set.
    pub async fn submit<F>(
        &mut self,
        payload: &str,
        submitter: &dyn TxSubmitter,
        display_delay: Duration,
        on_complete: F,
    ) -> Result<String, SigningError>
    where
        F: FnOnce(&str),
    {
        self.begin_submit()?;

        let submitted = match merge_and_submit(payload, self.unsigned_tx.as_ref(), submitter).await
        {
            Ok(submitted) => submitted,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        self.record_success(&submitted.tx_hash)?;
        on_complete(&submitted.tx_hash);
        tokio::time::sleep(display_delay).await;
        self.complete()?;
        Ok(submitted.tx_hash)
    }

    fn require(&self, expected: FlowState, action: &'static str) -> Result<(), SigningError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SigningError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }
}
