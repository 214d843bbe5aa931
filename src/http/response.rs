//! Error to response mapping.
//!
//! | Error                          | Status |
//! |--------------------------------|--------|
//! | no endpoint                    | 404    |
//! | body over the limit            | 413    |
//! | undecodable or mistyped input  | 400    |
//! | upstream unreachable or failed | 502    |
//! | anything else                  | 500    |
//!
//! Bodies are JSON: `{"error": "...", "request_id": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::codec::CodecError;
use crate::flow::FlowError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no endpoint for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("invalid request body: {0}")]
    Decode(#[source] CodecError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("failed to render response: {0}")]
    Render(#[source] CodecError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Decode(_) => StatusCode::BAD_REQUEST,
            GatewayError::Flow(FlowError::Input { .. }) => StatusCode::BAD_REQUEST,
            GatewayError::Flow(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            GatewayError::Flow(_) | GatewayError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response_with(self, request_id: &str) -> Response {
        let status = self.status();
        let body = json!({
            "error": self.to_string(),
            "request_id": request_id,
        });
        (status, Json(body)).into_response()
    }
}
