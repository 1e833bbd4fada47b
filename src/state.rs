// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::store::SessionStore;
use crate::xrpl::{LedgerClient, LedgerClientError, Network, TxSubmitter};

/// One submitter per supported network.
#[derive(Clone)]
pub struct Submitters {
    pub mainnet: Arc<dyn TxSubmitter>,
    pub testnet: Arc<dyn TxSubmitter>,
}

impl Submitters {
    /// JSON-RPC clients for both networks, honoring URL overrides.
    pub fn from_config(config: &AppConfig) -> Result<Self, LedgerClientError> {
        let mainnet = LedgerClient::new(Network::Mainnet, config.mainnet_rpc_url.as_deref())?;
        let testnet = LedgerClient::new(Network::Testnet, config.testnet_rpc_url.as_deref())?;
        tracing::info!(
            mainnet = mainnet.rpc_url(),
            testnet = testnet.rpc_url(),
            "Ledger endpoints configured"
        );
        Ok(Self {
            mainnet: Arc::new(mainnet),
            testnet: Arc::new(testnet),
        })
    }

    pub fn for_network(&self, network: Network) -> Arc<dyn TxSubmitter> {
        match network {
            Network::Mainnet => self.mainnet.clone(),
            Network::Testnet => self.testnet.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<RwLock<SessionStore>>,
    pub submitters: Submitters,
}

impl AppState {
    pub fn new(config: AppConfig, submitters: Submitters) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(SessionStore::new())),
            submitters,
        }
    }
}
