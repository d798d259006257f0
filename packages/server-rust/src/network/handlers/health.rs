//! Health, liveness, and readiness endpoint handlers.
//!
//! These handlers expose service state for orchestrators (Kubernetes, load
//! balancers) and operational monitoring. They are never gated by the
//! admission middleware, so they keep answering while the service drains.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::ServiceState;

/// Returns detailed health information as JSON.
///
/// Always returns 200 -- the `state` field in the response body tells
/// "up but draining" apart from "serving".
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let service_state = state.shutdown.service_state();
    let in_flight = state.shutdown.in_flight_count();
    let pending_publishes = state.service.pending_publishes();
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": service_state.as_str(),
        "in_flight": in_flight,
        "pending_publishes": pending_publishes,
        "uptime_secs": uptime_secs,
    }))
}

/// Kubernetes liveness probe -- always returns 200 OK.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe -- 200 while serving, 503 otherwise.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.service_state() == ServiceState::Serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
