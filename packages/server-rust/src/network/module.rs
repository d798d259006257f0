//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! requests. The split lets the lifecycle report a bind failure before it
//! declares the service `Serving`.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    health_handler, languages_handler, liveness_handler, readiness_handler, translate_handler,
    AppState,
};
use super::middleware::{admission, build_http_layers};
use super::shutdown::ShutdownController;
use crate::service::TranslationService;

/// Manages the HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- stores config and the shared shutdown controller
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- accepts requests until a drain is requested, then drains
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, shutdown: Arc<ShutdownController>) -> Self {
        Self {
            config,
            listener: None,
            shutdown,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `POST /v1/translate` -- Translate (admission-gated)
    /// - `GET /v1/languages` -- `GetSupportedLanguages` (admission-gated)
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- Kubernetes liveness probe
    /// - `GET /health/ready` -- Kubernetes readiness probe
    pub fn build_router(&self, service: Arc<TranslationService>) -> Router {
        let state = AppState {
            service,
            shutdown: Arc::clone(&self.shutdown),
            start_time: Instant::now(),
        };

        Router::new()
            .route("/v1/translate", post(translate_handler))
            .route("/v1/languages", get(languages_handler))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                admission,
            ))
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound address, whose port may differ from the
    /// configured one when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        let addr = listener.local_addr()?;

        info!(%addr, "TCP listener bound");

        self.listener = Some(listener);
        Ok(addr)
    }

    /// Serves requests until a drain is requested on the shutdown controller.
    ///
    /// After the drain request:
    /// 1. The listener stops accepting and open connections finish gracefully
    /// 2. Connections still open after `drain_timeout` are abandoned
    /// 3. The rest of `drain_timeout` is spent waiting on in-flight requests
    ///
    /// Returns once draining is over; the state stays `Draining`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hit
    /// a fatal I/O error.
    pub async fn serve(mut self, service: Arc<TranslationService>) -> anyhow::Result<()> {
        let Some(listener) = self.listener.take() else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = self.build_router(service);
        let shutdown = self.shutdown;
        let drain_timeout = self.config.drain_timeout;

        let mut server = tokio::spawn(
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.drain_requested())
                .into_future(),
        );

        let exited_early = tokio::select! {
            joined = &mut server => Some(joined),
            () = shutdown.drain_requested() => None,
        };
        let drain_started = Instant::now();

        let joined = if let Some(joined) = exited_early {
            shutdown.begin_drain();
            joined
        } else {
            info!(
                in_flight = shutdown.in_flight_count(),
                "drain requested, closing listener"
            );
            if let Ok(joined) = tokio::time::timeout(drain_timeout, &mut server).await {
                joined
            } else {
                warn!("drain timeout expired before all connections closed");
                server.abort();
                Ok(Ok(()))
            }
        };

        let remaining = drain_timeout.saturating_sub(drain_started.elapsed());
        if shutdown.wait_for_drain(remaining).await {
            info!("all in-flight requests completed");
        } else {
            warn!(
                in_flight = shutdown.in_flight_count(),
                "drain timeout expired with in-flight requests remaining"
            );
        }

        joined??;
        Ok(())
    }
}
