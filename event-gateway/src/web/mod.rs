//! Web server module for receiving signed events.
//!
//! The handlers only validate request shape and map gateway outcomes to HTTP
//! responses. Verification, publishing and alerting live in the gateway.

pub mod handlers;

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use handlers::{
    health, receive_event, AppState, ErrorDetail, HealthResponse, SignatureParams,
};

/// Build the application router.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/:server_event", post(receive_event))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
