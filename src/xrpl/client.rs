// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! XRPL JSON-RPC client.
//!
//! Only the `submit` method is used: the signed blob is broadcast and the
//! preliminary engine result is reported back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::types::{is_positive_engine_result, Network, SubmitResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Broadcasts signed transaction blobs.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn submit(&self, tx_blob: &str) -> Result<SubmitResult, LedgerClientError>;
}

/// JSON-RPC client bound to one network endpoint.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    network: Network,
    rpc_url: url::Url,
    http: Client,
}

impl LedgerClient {
    /// Create a client for `network`, using `rpc_url` when given.
    pub fn new(network: Network, rpc_url: Option<&str>) -> Result<Self, LedgerClientError> {
        let raw = rpc_url.unwrap_or(network.config().rpc_url);
        let rpc_url: url::Url = raw
            .parse()
            .map_err(|e: url::ParseError| LedgerClientError::InvalidRpcUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LedgerClientError::Transport(e.to_string()))?;

        Ok(Self {
            network,
            rpc_url,
            http,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_str()
    }
}

#[async_trait]
impl TxSubmitter for LedgerClient {
    async fn submit(&self, tx_blob: &str) -> Result<SubmitResult, LedgerClientError> {
        let body = json!({
            "method": "submit",
            "params": [{ "tx_blob": tx_blob }],
        });

        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LedgerClientError::Transport(format!(
                "{} returned {status}: {text}",
                self.network
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LedgerClientError::InvalidResponse(e.to_string()))?;

        let result = parse_submit_response(&payload)?;
        tracing::info!(
            network = %self.network,
            engine_result = %result.engine_result,
            tx_hash = ?result.tx_hash,
            "Submitted transaction"
        );
        Ok(result)
    }
}

/// Interpret a `submit` JSON-RPC response body.
///
/// RPC-level failures (`status: "error"`) become an unsuccessful result that
/// carries the node's error message, so callers surface it like an engine
/// rejection.
pub fn parse_submit_response(payload: &Value) -> Result<SubmitResult, LedgerClientError> {
    let result = payload
        .get("result")
        .ok_or_else(|| LedgerClientError::InvalidResponse("missing `result`".to_string()))?;
    let text = |key: &str| result.get(key).and_then(Value::as_str);

    if text("status") == Some("error") {
        let code = text("error").unwrap_or("error");
        let message = text("error_message").or(text("error_exception")).unwrap_or(code);
        return Ok(SubmitResult {
            success: false,
            engine_result: code.to_string(),
            engine_result_message: message.to_string(),
            tx_hash: None,
        });
    }

    let engine_result = text("engine_result").ok_or_else(|| {
        LedgerClientError::InvalidResponse("missing `engine_result`".to_string())
    })?;
    let engine_result_message = text("engine_result_message").unwrap_or_default();
    let tx_hash = result
        .get("tx_json")
        .and_then(|tx| tx.get("hash"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(SubmitResult {
        success: is_positive_engine_result(engine_result),
        engine_result: engine_result.to_string(),
        engine_result_message: engine_result_message.to_string(),
        tx_hash,
    })
}

/// Errors that can occur while talking to a ledger node.
#[derive(Debug, thiserror::Error)]
pub enum LedgerClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Ledger request failed: {0}")]
    Transport(String),

    #[error("Ledger response was invalid: {0}")]
    InvalidResponse(String),
}
