// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing session endpoints.
//!
//! The client shows `sign_request` to the device, then posts every QR text
//! its camera decodes. When the device response is fully reassembled the
//! signature is merged and submitted. The session lock is not held during
//! the ledger round trip.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        CreateSessionRequest, FragmentResponse, FragmentStatus, SessionResponse,
        SubmitFragmentRequest,
    },
    scan::ReceiveOutcome,
    signing::{extract_tx_payload, merge_and_submit, FlowState},
    state::AppState,
    store::SigningSession,
    ur::ReconstructedResource,
};

#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = CreateSessionRequest,
    tag = "Sessions",
    responses(
        (status = 201, body = SessionResponse),
        (status = 422, description = "Unsigned transaction cannot be encoded")
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = SigningSession::new(
        request.network,
        request.unsigned_tx,
        state.config.ur_max_fragment_len,
    )?;
    let response = session.to_response();

    info!(
        session_id = %session.id,
        network = %session.network,
        frames = session.sign_request.len(),
        "Signing session created"
    );
    state.sessions.write().await.insert(session);
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}",
    params(("session_id" = Uuid, Path, description = "Signing session ID")),
    tag = "Sessions",
    responses((status = 200, body = SessionResponse), (status = 404))
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let store = state.sessions.read().await;
    Ok(Json(store.get(&session_id)?.to_response()))
}

#[utoipa::path(
    delete,
    path = "/v1/sessions/{session_id}",
    params(("session_id" = Uuid, Path, description = "Signing session ID")),
    tag = "Sessions",
    responses((status = 204), (status = 404))
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.sessions.write().await.remove(&session_id)?;
    info!(session_id = %session_id, "Signing session cancelled");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/fragments",
    params(("session_id" = Uuid, Path, description = "Signing session ID")),
    request_body = SubmitFragmentRequest,
    tag = "Sessions",
    responses(
        (status = 200, body = FragmentResponse),
        (status = 404),
        (status = 409, description = "Session is submitting or complete"),
        (status = 422, description = "Response could not be merged into a transaction"),
        (status = 502, description = "Ledger rejected the transaction")
    )
)]
pub async fn submit_fragment(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SubmitFragmentRequest>,
) -> Result<Json<FragmentResponse>, ApiError> {
    let (payload, unsigned_tx, network, mut snapshot) = {
        let mut store = state.sessions.write().await;
        let session = store.get_mut(&session_id)?;
        if session.flow.state() != FlowState::QrDisplay {
            return Err(ApiError::conflict(format!(
                "Session is {}",
                session.flow.state()
            )));
        }
        session.touch();

        let resource = match completed_resource(session.reassembly.receive(&request.fragment)) {
            Ok(resource) => resource,
            Err((status, detail)) => {
                return Ok(Json(FragmentResponse {
                    status,
                    detail,
                    session: session.to_response(),
                }));
            }
        };

        session.flow.begin_submit()?;
        match extract_tx_payload(&resource) {
            Ok(payload) => (
                payload,
                session.flow.unsigned_tx().cloned(),
                session.network,
                session.to_response(),
            ),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Scanned response carries no payload");
                session.flow.fail(&e);
                session.reassembly.reset();
                return Err(e.into());
            }
        }
    };

    let submitter = state.submitters.for_network(network);
    let result = merge_and_submit(&payload, unsigned_tx.as_ref(), submitter.as_ref()).await;

    let submitted = match result {
        Ok(submitted) => submitted,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Signing attempt failed");
            if let Ok(session) = state.sessions.write().await.get_mut(&session_id) {
                session.flow.fail(&e);
                session.reassembly.reset();
            }
            return Err(e.into());
        }
    };
    info!(
        session_id = %session_id,
        network = %network,
        tx_hash = %submitted.tx_hash,
        kind = ?submitted.kind,
        "Signed transaction submitted"
    );

    let mut store = state.sessions.write().await;
    let Ok(session) = store.get_mut(&session_id) else {
        // Cancelled or reaped while the ledger call was in flight. The
        // transaction is on its way regardless, so report it.
        warn!(
            session_id = %session_id,
            tx_hash = %submitted.tx_hash,
            "Session ended before the submission was recorded"
        );
        snapshot.explorer_url = Some(network.explorer_tx_url(&submitted.tx_hash));
        snapshot.tx_hash = Some(submitted.tx_hash);
        return Ok(Json(FragmentResponse {
            status: FragmentStatus::Submitted,
            detail: Some("Session ended during submission".to_string()),
            session: snapshot,
        }));
    };
    session.flow.record_success(&submitted.tx_hash)?;
    schedule_completion(&state, session_id);
    Ok(Json(FragmentResponse {
        status: FragmentStatus::Submitted,
        detail: None,
        session: session.to_response(),
    }))
}

/// Split a reassembly outcome into the finished resource or the status to report.
fn completed_resource(
    outcome: ReceiveOutcome,
) -> Result<ReconstructedResource, (FragmentStatus, Option<String>)> {
    match outcome {
        ReceiveOutcome::Complete(resource) => Ok(resource),
        ReceiveOutcome::Ignored => Err((FragmentStatus::Ignored, None)),
        ReceiveOutcome::Duplicate | ReceiveOutcome::AlreadySubmitted => {
            Err((FragmentStatus::Duplicate, None))
        }
        ReceiveOutcome::Rejected(e) => Err((FragmentStatus::Rejected, Some(e.to_string()))),
        ReceiveOutcome::Progress(_) => Err((FragmentStatus::InProgress, None)),
        ReceiveOutcome::ReconstructionFailed(e) => Err((
            FragmentStatus::ReconstructionFailed,
            Some(e.to_string()),
        )),
    }
}

/// Move the session to `complete` once the success screen has been shown.
fn schedule_completion(state: &AppState, session_id: Uuid) {
    let sessions = state.sessions.clone();
    let delay = state.config.complete_display_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut store = sessions.write().await;
        // The session may have been cancelled in the meantime.
        if let Ok(session) = store.get_mut(&session_id) {
            if let Err(e) = session.flow.complete() {
                warn!(session_id = %session_id, error = %e, "Failed to complete session");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};

    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use super::*;
    use crate::state::testing::{accepting_state, state_with};
    use crate::state::Submitters;
    use crate::store::SessionStore;
    use crate::ur::{cbor, UrEncoder};
    use crate::xrpl::{LedgerClientError, Network, SubmitResult, TxSubmitter};

    fn offer_create() -> Value {
        json!({
            "TransactionType": "OfferCreate",
            "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
            "TakerGets": "1000000",
            "TakerPays": {
                "currency": "USD",
                "issuer": "rrrrrrrrrrrrrrrrrrrrrhoLvTp",
                "value": "1.5"
            },
            "Fee": "12",
            "Sequence": 9,
            "SigningPubKey": "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020"
        })
    }

    /// Device response: a CBOR map carrying a bare signature, split into parts.
    fn device_response() -> Vec<String> {
        let signature = format!("3044{}", "EF".repeat(68));
        let body = cbor::encode(&cbor::CborValue::Map(vec![(
            cbor::CborValue::Text("signature".to_string()),
            cbor::CborValue::Text(signature),
        )]));
        UrEncoder::new("bytes", &body, 30).unwrap().first_pass()
    }

    async fn create(state: &AppState) -> Uuid {
        let (status, Json(session)) = create_session(
            State(state.clone()),
            Json(CreateSessionRequest {
                network: Network::Testnet,
                unsigned_tx: Some(offer_create()),
            }),
        )
        .await
        .expect("session creation succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(session.state, FlowState::QrDisplay);
        assert!(!session.sign_request.is_empty());
        session.session_id
    }

    async fn post(state: &AppState, id: Uuid, fragment: &str) -> Result<FragmentResponse, ApiError> {
        submit_fragment(
            State(state.clone()),
            Path(id),
            Json(SubmitFragmentRequest {
                fragment: fragment.to_string(),
            }),
        )
        .await
        .map(|Json(response)| response)
    }

    #[tokio::test]
    async fn scanned_response_is_submitted_then_completes() {
        let state = accepting_state();
        let id = create(&state).await;
        let parts = device_response();
        assert!(parts.len() > 1);

        assert_eq!(
            post(&state, id, "https://not-a-ur").await.unwrap().status,
            FragmentStatus::Ignored
        );
        for part in &parts[..parts.len() - 1] {
            let response = post(&state, id, part).await.unwrap();
            assert_eq!(response.status, FragmentStatus::InProgress);
        }
        assert_eq!(
            post(&state, id, &parts[0]).await.unwrap().status,
            FragmentStatus::Duplicate
        );

        let done = post(&state, id, &parts[parts.len() - 1]).await.unwrap();
        assert_eq!(done.status, FragmentStatus::Submitted);
        assert_eq!(done.session.state, FlowState::Submitting);
        assert_eq!(done.session.tx_hash.as_deref(), Some("A1B2C3"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let Json(session) = get_session(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(session.state, FlowState::Complete);

        let err = post(&state, id, &parts[0]).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn rejected_submission_returns_to_qr_display() {
        let state = state_with(SubmitResult {
            success: false,
            engine_result: "tecUNFUNDED_OFFER".to_string(),
            engine_result_message: "tecUNFUNDED_OFFER".to_string(),
            tx_hash: None,
        });
        let id = create(&state).await;
        let parts = device_response();

        let mut last = None;
        for part in &parts {
            last = Some(post(&state, id, part).await);
        }
        let err = last.unwrap().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "tecUNFUNDED_OFFER");

        let Json(session) = get_session(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(session.state, FlowState::QrDisplay);
        assert_eq!(session.last_error.as_deref(), Some("tecUNFUNDED_OFFER"));
        assert!(session.progress.is_none());

        // The user can scan again.
        assert_eq!(
            post(&state, id, &parts[0]).await.unwrap().status,
            FragmentStatus::InProgress
        );
    }

    /// Accepts the transaction after the session has been cancelled.
    struct CancelDuringSubmit {
        sessions: Arc<RwLock<SessionStore>>,
        session_id: Uuid,
    }

    #[async_trait]
    impl TxSubmitter for CancelDuringSubmit {
        async fn submit(&self, _tx_blob: &str) -> Result<SubmitResult, LedgerClientError> {
            self.sessions.write().await.remove(&self.session_id).unwrap();
            Ok(SubmitResult {
                success: true,
                engine_result: "tesSUCCESS".to_string(),
                engine_result_message: "The transaction was applied.".to_string(),
                tx_hash: Some("D4E5F6".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn accepted_transaction_is_reported_when_session_ends_mid_submit() {
        let base = accepting_state();
        let id = create(&base).await;
        let submitter: Arc<dyn TxSubmitter> = Arc::new(CancelDuringSubmit {
            sessions: base.sessions.clone(),
            session_id: id,
        });
        let state = AppState {
            submitters: Submitters {
                mainnet: submitter.clone(),
                testnet: submitter,
            },
            ..base
        };

        let parts = device_response();
        let mut last = None;
        for part in &parts {
            last = Some(post(&state, id, part).await);
        }
        let done = last.unwrap().expect("accepted submission is not an error");
        assert_eq!(done.status, FragmentStatus::Submitted);
        assert_eq!(done.session.session_id, id);
        assert_eq!(done.session.tx_hash.as_deref(), Some("D4E5F6"));
        assert!(done.session.explorer_url.unwrap().ends_with("/transactions/D4E5F6"));
        assert!(done.detail.is_some());

        assert!(get_session(State(state.clone()), Path(id)).await.is_err());
    }

    #[tokio::test]
    async fn missing_session_and_cancel() {
        let state = accepting_state();
        let err = post(&state, Uuid::new_v4(), "ur:bytes/x").await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let id = create(&state).await;
        let status = delete_session(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(get_session(State(state.clone()), Path(id)).await.is_err());
    }

    #[tokio::test]
    async fn invalid_template_is_unprocessable() {
        let state = accepting_state();
        let err = create_session(
            State(state),
            Json(CreateSessionRequest {
                network: Network::Mainnet,
                unsigned_tx: Some(json!({"TransactionType": "Unknown"})),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
