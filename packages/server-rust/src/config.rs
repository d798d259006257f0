//! Process configuration read from flags and environment variables.
//!
//! Every setting has an environment variable; command-line flags override
//! them. Settings without a sensible default (the DeepL key) are rejected by
//! [`ServiceConfig::validate`] before any external resource is touched.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::network::NetworkConfig;
use crate::providers::DeepLConfig;
use crate::publisher::KafkaConfig;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// A required setting is missing or unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Translation service settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "lingo-server", version, about = "Translation service with event publishing")]
pub struct ServiceConfig {
    /// Address the listener binds to.
    #[arg(long, env = "GRPC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the listener binds to. 0 picks an ephemeral port.
    #[arg(long, env = "GRPC_PORT", default_value_t = 50051)]
    pub port: u16,

    /// DeepL authentication key.
    #[arg(long, env = "DEEPL_API_KEY", default_value = "", hide_env_values = true)]
    pub deepl_api_key: String,

    /// Overrides the DeepL endpoint derived from the key.
    #[arg(long, env = "DEEPL_API_URL")]
    pub deepl_api_url: Option<String>,

    /// Timeout for each DeepL call, in seconds.
    #[arg(long, env = "DEEPL_TIMEOUT_SECS", default_value_t = 10)]
    pub deepl_timeout_secs: u64,

    /// Comma-separated Kafka bootstrap brokers as `host:port`.
    #[arg(
        long,
        env = "KAFKA_BROKERS",
        value_delimiter = ',',
        default_value = "localhost:9092"
    )]
    pub kafka_brokers: Vec<String>,

    /// Topic receiving translation events.
    #[arg(long, env = "KAFKA_TOPIC", default_value = "translations")]
    pub kafka_topic: String,

    /// Producer client identity.
    #[arg(long, env = "KAFKA_CLIENT_ID", default_value = "translation-svc")]
    pub kafka_client_id: String,

    /// Upper bound on the broker connect and on each produce call, in seconds.
    #[arg(long, env = "KAFKA_TIMEOUT_SECS", default_value_t = 5)]
    pub kafka_timeout_secs: u64,

    /// Comma-separated allowed CORS origins; `*` allows any.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Maximum time a single request may take, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Upper bound on waiting for in-flight requests during drain, in seconds.
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout_secs: u64,

    /// Upper bound on waiting for outstanding event publishes, in seconds.
    #[arg(long, env = "PUBLISH_FLUSH_TIMEOUT_SECS", default_value_t = 5)]
    pub publish_flush_timeout_secs: u64,

    /// Upper bound on the publisher disconnect, in seconds.
    #[arg(long, env = "DISCONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub disconnect_timeout_secs: u64,

    /// Port for the Prometheus scrape endpoint; disabled when unset.
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
            deepl_api_key: String::new(),
            deepl_api_url: None,
            deepl_timeout_secs: 10,
            kafka_brokers: vec!["localhost:9092".to_string()],
            kafka_topic: "translations".to_string(),
            kafka_client_id: "translation-svc".to_string(),
            kafka_timeout_secs: 5,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            drain_timeout_secs: 30,
            publish_flush_timeout_secs: 5,
            disconnect_timeout_secs: 10,
            metrics_port: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServiceConfig {
    /// Checks the settings the service cannot start without.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for a blank DeepL key, topic, or
    /// client id, or an empty broker list, and [`ConfigError::Invalid`] for
    /// zero-length provider or drain timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deepl_api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "DEEPL_API_KEY",
            });
        }
        if self.brokers().is_empty() {
            return Err(ConfigError::Missing {
                name: "KAFKA_BROKERS",
            });
        }
        if self.kafka_topic.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "KAFKA_TOPIC",
            });
        }
        if self.kafka_client_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "KAFKA_CLIENT_ID",
            });
        }
        if self.deepl_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "DEEPL_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.kafka_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "KAFKA_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.drain_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "DRAIN_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Listener and HTTP transport settings.
    #[must_use]
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
        }
    }

    /// DeepL client settings.
    #[must_use]
    pub fn deepl(&self) -> DeepLConfig {
        DeepLConfig {
            api_key: self.deepl_api_key.trim().to_string(),
            base_url: self
                .deepl_api_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            timeout: Duration::from_secs(self.deepl_timeout_secs),
        }
    }

    /// Kafka producer settings.
    #[must_use]
    pub fn kafka(&self) -> KafkaConfig {
        KafkaConfig {
            brokers: self.brokers(),
            topic: self.kafka_topic.trim().to_string(),
            client_id: self.kafka_client_id.trim().to_string(),
            timeout: Duration::from_secs(self.kafka_timeout_secs),
        }
    }

    #[must_use]
    pub fn publish_flush_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_flush_timeout_secs)
    }

    #[must_use]
    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.disconnect_timeout_secs)
    }

    /// Address of the Prometheus scrape endpoint, if enabled.
    #[must_use]
    pub fn metrics_address(&self) -> Option<SocketAddr> {
        self.metrics_port
            .map(|port| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
    }

    fn brokers(&self) -> Vec<String> {
        self.kafka_brokers
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect()
    }
}
