//! `lingo-server` binary: reads config, starts the service, and runs it until
//! SIGTERM or Ctrl+C.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use lingo_core::{EventPublisher, TranslationProvider};
use lingo_server::lifecycle::wait_for_shutdown_signal;
use lingo_server::providers::DeepLClient;
use lingo_server::publisher::KafkaPublisher;
use lingo_server::telemetry::{init_tracing, install_metrics_exporter};
use lingo_server::{Lifecycle, ServiceConfig};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = ServiceConfig::parse();

    if let Err(err) = init_tracing(config.log_format) {
        eprintln!("failed to initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }

    if let Some(addr) = config.metrics_address() {
        if let Err(err) = install_metrics_exporter(addr) {
            error!(error = %err, "failed to start Prometheus exporter");
            return ExitCode::FAILURE;
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting lingo-server");

    let provider: Arc<dyn TranslationProvider> = Arc::new(DeepLClient::new(config.deepl()));
    let publisher: Arc<dyn EventPublisher> = Arc::new(KafkaPublisher::new(config.kafka()));

    let running = match Lifecycle::new(config).start(provider, publisher).await {
        Ok(running) => running,
        Err(err) => {
            error!(error = %err, "lingo-server failed to start");
            return ExitCode::FAILURE;
        }
    };

    match running.run_until_signal(wait_for_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = ?err, "lingo-server stopped with an error");
            ExitCode::FAILURE
        }
    }
}
