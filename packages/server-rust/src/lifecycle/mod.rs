//! Startup and shutdown sequencing.
//!
//! [`Lifecycle::start`] validates config, initializes the provider, connects
//! the publisher, and binds the listener, in that order; only then does the
//! service become `Serving`. [`RunningService::run`] serves until a drain is
//! requested, then flushes outstanding publishes and disconnects the
//! publisher before reporting `Stopped`.

pub mod signals;

pub use signals::{wait_for_shutdown_signal, ShutdownSignal};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lingo_core::{DependencyError, EventPublisher, TranslationProvider};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ServiceConfig};
use crate::network::{NetworkModule, ServiceState, ShutdownController};
use crate::service::TranslationService;

/// Why the service never reached `Serving`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("translation provider failed to initialize: {0}")]
    Provider(#[source] DependencyError),
    #[error("event publisher failed to connect: {0}")]
    Publisher(#[source] DependencyError),
    #[error("failed to bind {address}: {message}")]
    Bind { address: String, message: String },
}

/// Drives the service from `Uninitialized` to `Serving`.
pub struct Lifecycle {
    config: ServiceConfig,
    shutdown: Arc<ShutdownController>,
}

impl Lifecycle {
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Returns the controller that tracks this service's state.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Brings the service up.
    ///
    /// On any failure the state moves to `Stopped` and nothing is served. A
    /// publisher that already connected is disconnected again, best effort.
    ///
    /// # Errors
    ///
    /// Returns the first [`StartupError`] hit along the startup sequence.
    pub async fn start(
        self,
        provider: Arc<dyn TranslationProvider>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<RunningService, StartupError> {
        let shutdown = self.shutdown;
        let config = self.config;
        advance(&shutdown, ServiceState::Initializing);

        let started = bring_up(&config, &shutdown, provider.as_ref(), publisher.as_ref()).await;

        let (module, local_addr) = match started {
            Ok(ready) => ready,
            Err(err) => {
                error!(error = %err, "startup failed");
                advance(&shutdown, ServiceState::Stopped);
                return Err(err);
            }
        };

        let service = Arc::new(TranslationService::new(provider, Arc::clone(&publisher)));
        advance(&shutdown, ServiceState::Serving);
        info!(%local_addr, "translation service serving");

        Ok(RunningService {
            module,
            service,
            publisher,
            shutdown,
            local_addr,
            publish_flush_timeout: config.publish_flush_timeout(),
            disconnect_timeout: config.disconnect_timeout(),
        })
    }
}

/// Runs the startup steps that can fail, in order.
async fn bring_up(
    config: &ServiceConfig,
    shutdown: &Arc<ShutdownController>,
    provider: &dyn TranslationProvider,
    publisher: &dyn EventPublisher,
) -> Result<(NetworkModule, SocketAddr), StartupError> {
    config.validate()?;

    provider.init().await.map_err(StartupError::Provider)?;
    info!("translation provider initialized");

    publisher.connect().await.map_err(StartupError::Publisher)?;
    info!("event publisher connected");

    let network = config.network();
    let address = network.bind_address();
    let mut module = NetworkModule::new(network, Arc::clone(shutdown));
    match module.start().await {
        Ok(addr) => Ok((module, addr)),
        Err(err) => {
            disconnect(publisher, config.disconnect_timeout()).await;
            Err(StartupError::Bind {
                address,
                message: format!("{err:#}"),
            })
        }
    }
}

/// A service in the `Serving` state, ready to [`run`](Self::run).
pub struct RunningService {
    module: NetworkModule,
    service: Arc<TranslationService>,
    publisher: Arc<dyn EventPublisher>,
    shutdown: Arc<ShutdownController>,
    local_addr: SocketAddr,
    publish_flush_timeout: Duration,
    disconnect_timeout: Duration,
}

impl RunningService {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that can start a drain from anywhere.
    #[must_use]
    pub fn drain_handle(&self) -> DrainHandle {
        DrainHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Serves until `signal` resolves or a [`DrainHandle`] drains, then stops.
    ///
    /// Shutdown order: stop admitting, wait for in-flight requests, flush
    /// outstanding publishes, disconnect the publisher, move to `Stopped`.
    /// Each wait is bounded by its configured timeout.
    ///
    /// # Errors
    ///
    /// Returns the server's fatal I/O error, if any. Shutdown still runs to
    /// `Stopped` in that case.
    pub async fn run(self, signal: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let trigger = self.drain_handle();
        let watcher = tokio::spawn(async move {
            signal.await;
            trigger.drain();
        });

        let served = self.module.serve(Arc::clone(&self.service)).await;
        watcher.abort();
        if let Err(err) = &served {
            error!(error = %err, "HTTP server failed");
        }

        if !self.service.flush_publishes(self.publish_flush_timeout).await {
            warn!(
                pending = self.service.pending_publishes(),
                "publish flush timed out, abandoning outstanding events"
            );
        }

        disconnect(self.publisher.as_ref(), self.disconnect_timeout).await;

        advance(&self.shutdown, ServiceState::Stopped);
        info!("translation service stopped");
        served
    }

    /// Like [`run`](Self::run), driven by a signal waiter that can fail.
    ///
    /// A waiter that fails still drains the service, and its error is
    /// returned once shutdown has reached `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns the server's fatal I/O error, or the signal waiter's error.
    pub async fn run_until_signal<F>(self, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = anyhow::Result<ShutdownSignal>> + Send + 'static,
    {
        let (failed_tx, failed_rx) = oneshot::channel();
        let waiter = async move {
            if let Err(err) = signal.await {
                error!(error = %err, "signal handling failed, draining now");
                let _ = failed_tx.send(err);
            }
        };

        self.run(waiter).await?;
        match failed_rx.await {
            Ok(err) => Err(err.context("shutdown signal handling failed")),
            Err(_) => Ok(()),
        }
    }
}

/// Starts a drain on a running service.
#[derive(Debug, Clone)]
pub struct DrainHandle {
    shutdown: Arc<ShutdownController>,
}

impl DrainHandle {
    /// Moves `Serving` to `Draining`.
    ///
    /// Returns `false` without side effects when the service is not serving,
    /// including when a drain has already begun.
    pub fn drain(&self) -> bool {
        let started = self.shutdown.begin_drain();
        if started {
            info!("drain started");
        } else {
            debug!(state = self.state().as_str(), "drain ignored");
        }
        started
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.shutdown.service_state()
    }
}

fn advance(shutdown: &ShutdownController, next: ServiceState) {
    match shutdown.transition(next) {
        Ok(previous) => debug!(from = previous.as_str(), to = next.as_str(), "service state changed"),
        Err(err) => warn!(error = %err, "ignored service state change"),
    }
}

async fn disconnect(publisher: &dyn EventPublisher, timeout: Duration) {
    match tokio::time::timeout(timeout, publisher.disconnect()).await {
        Ok(Ok(())) => info!("event publisher disconnected"),
        Ok(Err(err)) => warn!(error = %err, "event publisher disconnect failed"),
        Err(_) => warn!("event publisher disconnect timed out"),
    }
}
