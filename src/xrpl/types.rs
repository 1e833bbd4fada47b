// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network identifiers and ledger result types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// XRPL network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Default JSON-RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// XRPL mainnet configuration.
pub const XRPL_MAINNET: NetworkConfig = NetworkConfig {
    name: "XRP Ledger Mainnet",
    rpc_url: "https://xrplcluster.com",
    explorer_url: "https://livenet.xrpl.org",
};

/// XRPL testnet configuration.
pub const XRPL_TESTNET: NetworkConfig = NetworkConfig {
    name: "XRP Ledger Testnet",
    rpc_url: "https://s.altnet.rippletest.net:51234",
    explorer_url: "https://testnet.xrpl.org",
};

/// Engine results that count as a successful broadcast.
pub const POSITIVE_ENGINE_RESULTS: &[&str] = &["tesSUCCESS", "terQUEUED"];

/// Supported network identifiers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    pub fn config(self) -> &'static NetworkConfig {
        match self {
            Network::Mainnet => &XRPL_MAINNET,
            Network::Testnet => &XRPL_TESTNET,
        }
    }

    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(self, tx_hash: &str) -> String {
        format!("{}/transactions/{tx_hash}", self.config().explorer_url)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!(
                "Unsupported network `{other}`; expected `mainnet` or `testnet`."
            )),
        }
    }
}

/// Outcome of a `submit` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmitResult {
    /// Whether the engine result is positive
    pub success: bool,
    /// Engine result code (e.g. `tesSUCCESS`, `tecUNFUNDED_OFFER`)
    pub engine_result: String,
    /// Human-readable engine message
    pub engine_result_message: String,
    /// Transaction hash, when the node returned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl SubmitResult {
    /// Message shown when the submission was not accepted.
    ///
    /// Prefers the engine message and falls back to the result code.
    pub fn failure_reason(&self) -> String {
        if self.engine_result_message.is_empty() {
            self.engine_result.clone()
        } else {
            self.engine_result_message.clone()
        }
    }
}

pub fn is_positive_engine_result(code: &str) -> bool {
    POSITIVE_ENGINE_RESULTS.contains(&code)
}
