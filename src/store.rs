// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory signing sessions.
//!
//! A session lives from the moment the sign request is shown until the
//! client deletes it or the reaper drops it after the idle TTL.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::SessionResponse;
use crate::scan::ReassemblySession;
use crate::signing::SigningFlow;
use crate::ur::{cbor, UrEncoder};
use crate::xrpl::{encode_transaction, Network};

/// UR type of the sign request: the transaction JSON as a CBOR byte string.
const SIGN_REQUEST_UR_TYPE: &str = "bytes";

pub struct SigningSession {
    pub id: Uuid,
    pub network: Network,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sign_request: Vec<String>,
    pub flow: SigningFlow,
    pub reassembly: ReassemblySession,
}

impl SigningSession {
    /// Validate the unsigned transaction and render its sign request.
    pub fn new(
        network: Network,
        unsigned_tx: Option<Value>,
        max_fragment_len: usize,
    ) -> Result<Self, ApiError> {
        let sign_request = match &unsigned_tx {
            Some(tx) => {
                // Reject templates the codec cannot serialize before showing them.
                encode_transaction(tx)?;
                let json = serde_json::to_vec(tx)
                    .map_err(|e| ApiError::internal(format!("Failed to serialize transaction: {e}")))?;
                let mut encoder = UrEncoder::new(
                    SIGN_REQUEST_UR_TYPE,
                    &cbor::encode_bytes(&json),
                    max_fragment_len,
                )?;
                encoder.first_pass()
            }
            None => Vec::new(),
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            network,
            created_at: now,
            updated_at: now,
            sign_request,
            flow: SigningFlow::new(unsigned_tx),
            reassembly: ReassemblySession::new(),
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn to_response(&self) -> SessionResponse {
        let tx_hash = self.flow.tx_hash().map(str::to_string);
        SessionResponse {
            session_id: self.id,
            network: self.network,
            state: self.flow.state(),
            progress: self.reassembly.progress(),
            sign_request: self.sign_request.clone(),
            explorer_url: tx_hash.as_deref().map(|h| self.network.explorer_tx_url(h)),
            tx_hash,
            last_error: self.flow.last_error().map(str::to_string),
            created_at: self.created_at,
        }
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, SigningSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: SigningSession) -> Uuid {
        let id = session.id;
        self.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: &Uuid) -> Result<&SigningSession, ApiError> {
        self.sessions
            .get(id)
            .ok_or_else(|| ApiError::not_found("Session not found"))
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Result<&mut SigningSession, ApiError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found("Session not found"))
    }

    pub fn remove(&mut self, id: &Uuid) -> Result<(), ApiError> {
        if self.sessions.remove(id).is_some() {
            Ok(())
        } else {
            Err(ApiError::not_found("Session not found"))
        }
    }

    /// Drop sessions idle for longer than `ttl`. Returns the removed IDs.
    pub fn remove_idle(&mut self, ttl: Duration, now: DateTime<Utc>) -> Vec<Uuid> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expired: Vec<Uuid> = self
            .sessions
            .values()
            .filter(|s| now.signed_duration_since(s.updated_at) > ttl)
            .map(|s| s.id)
            .collect();
        for id in &expired {
            self.sessions.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
