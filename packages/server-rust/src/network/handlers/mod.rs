//! HTTP handler definitions for the translation server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors), the HTTP mapping of [`RequestError`], and re-exports all
//! handler functions for convenient access when building the router.

pub mod health;
pub mod translate;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use translate::{languages_handler, translate_handler};

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::ShutdownController;
use crate::service::{RequestError, TranslationService};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Request handler owning the provider and publisher handles.
    pub service: Arc<TranslationService>,
    /// Service state machine with in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: RequestError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn invalid_argument_maps_to_400() {
        let (status, body) = render(RequestError::InvalidArgument("text is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
        assert_eq!(body["message"], "text is required");
    }

    #[tokio::test]
    async fn internal_maps_to_500() {
        let (status, body) = render(RequestError::Internal("deepl is not initialized".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal");
    }

    #[tokio::test]
    async fn unavailable_maps_to_503() {
        let (status, body) = render(RequestError::Unavailable).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "unavailable");
    }
}
