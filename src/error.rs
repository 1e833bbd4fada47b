// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::signing::SigningError;
use crate::ur::UrError;
use crate::xrpl::CodecError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        Self::unprocessable(err.to_string())
    }
}

impl From<UrError> for ApiError {
    fn from(err: UrError) -> Self {
        Self::unprocessable(err.to_string())
    }
}

impl From<SigningError> for ApiError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::InvalidTransition { .. } => Self::conflict(err.to_string()),
            SigningError::Rejected { .. } | SigningError::Submission(_) => {
                Self::bad_gateway(err.to_string())
            }
            _ => Self::unprocessable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    use crate::signing::FlowState;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unp.message, "oops");
    }

    #[test]
    fn signing_errors_map_to_statuses() {
        let rejected = ApiError::from(SigningError::Rejected {
            engine_result: "tecUNFUNDED_OFFER".to_string(),
            message: "tecUNFUNDED_OFFER".to_string(),
        });
        assert_eq!(rejected.status, StatusCode::BAD_GATEWAY);
        assert_eq!(rejected.message, "tecUNFUNDED_OFFER");

        let busy = ApiError::from(SigningError::InvalidTransition {
            state: FlowState::Submitting,
            action: "submit",
        });
        assert_eq!(busy.status, StatusCode::CONFLICT);

        let missing = ApiError::from(SigningError::MissingUnsignedTransaction);
        assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
