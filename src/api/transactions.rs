// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stateless XRPL binary codec endpoints.
//!
//! Useful to inspect what the device is asked to sign and what it returned.

use axum::Json;

use crate::{
    error::ApiError,
    models::{
        DecodeTransactionRequest, DecodeTransactionResponse, EncodeTransactionRequest,
        EncodeTransactionResponse,
    },
    xrpl::{decode_transaction, encode_transaction, transaction_hash},
};

#[utoipa::path(
    post,
    path = "/v1/transactions/encode",
    request_body = EncodeTransactionRequest,
    tag = "Transactions",
    responses(
        (status = 200, body = EncodeTransactionResponse),
        (status = 422, description = "Transaction JSON cannot be serialized")
    )
)]
pub async fn encode(
    Json(request): Json<EncodeTransactionRequest>,
) -> Result<Json<EncodeTransactionResponse>, ApiError> {
    let bytes = encode_transaction(&request.transaction)?;
    Ok(Json(EncodeTransactionResponse {
        tx_blob: hex::encode_upper(&bytes),
        hash: transaction_hash(&bytes),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/transactions/decode",
    request_body = DecodeTransactionRequest,
    tag = "Transactions",
    responses(
        (status = 200, body = DecodeTransactionResponse),
        (status = 400, description = "Blob is not hex"),
        (status = 422, description = "Blob is not a valid transaction")
    )
)]
pub async fn decode(
    Json(request): Json<DecodeTransactionRequest>,
) -> Result<Json<DecodeTransactionResponse>, ApiError> {
    let bytes = hex::decode(request.tx_blob.trim())
        .map_err(|e| ApiError::bad_request(format!("Invalid hex: {e}")))?;
    let transaction = decode_transaction(&bytes)?;
    Ok(Json(DecodeTransactionResponse {
        transaction,
        hash: transaction_hash(&bytes),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;

    const OFFER_CANCEL_BLOB: &str = "1200082200000000240000000520190000000368400000000000000C8114B5F762798A53D543A014CAF8B297CFF8F2F937E8";

    #[tokio::test]
    async fn encode_then_decode_returns_same_json() {
        let tx = json!({
            "TransactionType": "OfferCancel",
            "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
            "Fee": "12",
            "Flags": 0,
            "Sequence": 5,
            "OfferSequence": 3
        });

        let Json(encoded) = encode(Json(EncodeTransactionRequest { transaction: tx.clone() }))
            .await
            .expect("encode succeeds");
        assert_eq!(encoded.tx_blob, OFFER_CANCEL_BLOB);
        assert_eq!(encoded.hash.len(), 64);

        let Json(decoded) = decode(Json(DecodeTransactionRequest {
            tx_blob: encoded.tx_blob.to_lowercase(),
        }))
        .await
        .expect("decode succeeds");
        assert_eq!(decoded.transaction, tx);
        assert_eq!(decoded.hash, encoded.hash);
    }

    #[tokio::test]
    async fn bad_input_maps_to_client_errors() {
        let err = decode(Json(DecodeTransactionRequest {
            tx_blob: "zz".to_string(),
        }))
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = decode(Json(DecodeTransactionRequest {
            tx_blob: "12".to_string(),
        }))
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err = encode(Json(EncodeTransactionRequest {
            transaction: json!(["not", "an", "object"]),
        }))
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
