//! Event endpoint handlers.
//!
//! Request shape is validated here, before the gateway runs:
//! 1. Query parameters (`signature` required, identity optional)
//! 2. JSON body with exactly `event`, `character_id`, `utc_timestamp`
//!
//! Malformed requests get 422 and never reach verification or alerting.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gateway::{EventGateway, Identity, Outcome};
use crate::signature::EventRecord;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: EventGateway,
}

impl AppState {
    pub fn new(gateway: EventGateway) -> Self {
        Self { gateway }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Signed Event Endpoint
// =============================================================================

/// Query parameters accompanying an event.
#[derive(Debug, Deserialize)]
pub struct SignatureParams {
    pub signature: String,
    #[serde(default, rename = "appId")]
    pub app_id: Option<String>,
    #[serde(default, rename = "accountId")]
    pub account_id: Option<i64>,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<i64>,
}

impl SignatureParams {
    fn identity(&self) -> Identity {
        Identity {
            app_id: self.app_id.clone(),
            account_id: self.account_id,
            session_id: self.session_id,
        }
    }
}

/// Error body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    pub detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorDetail {
            detail: detail.into(),
        }),
    )
        .into_response()
}

/// Signed event endpoint.
///
/// Responds 201 with the echoed record when the signature verifies, 400 when
/// it does not, 422 for malformed requests and 500 when publishing fails.
pub async fn receive_event(
    State(state): State<AppState>,
    Path(server_event): Path<String>,
    params: Result<Query<SignatureParams>, QueryRejection>,
    body: Result<Json<EventRecord>, JsonRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => {
            warn!(server_event = %server_event, error = %e.body_text(), "event_malformed_query");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.body_text());
        }
    };

    let Json(event) = match body {
        Ok(b) => b,
        Err(e) => {
            warn!(server_event = %server_event, error = %e.body_text(), "event_malformed_payload");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.body_text());
        }
    };

    info!(
        server_event = %server_event,
        event = %event.event,
        has_identity = params.app_id.is_some()
            || params.account_id.is_some()
            || params.session_id.is_some(),
        "event_received"
    );

    let identity = params.identity();
    match state
        .gateway
        .handle(&server_event, event, &params.signature, &identity)
        .await
    {
        Ok(Outcome::Accepted(record)) => (StatusCode::CREATED, Json(record)).into_response(),
        Ok(Outcome::Rejected { .. }) => {
            error_response(StatusCode::BAD_REQUEST, "Invalid signature!")
        }
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    }
}
