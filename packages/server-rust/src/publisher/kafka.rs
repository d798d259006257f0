//! Kafka producer speaking the native broker protocol.
//!
//! `connect()` bootstraps from the configured `host:port` brokers, checks that
//! the topic exists, and opens one partition client per partition.
//! `publish()` produces a single keyed JSON record per event, routed to a
//! partition the way the Java client's default partitioner does it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::Utc;
use lingo_core::{DependencyError, EventPublisher, PublishError, TranslationEvent};
use rskafka::client::error::Error as KafkaError;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder};
use rskafka::record::Record;
use tracing::{debug, info};

const COMPONENT: &str = "kafka";

/// Settings for [`KafkaPublisher`].
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Bootstrap brokers as `host:port`.
    pub brokers: Vec<String>,
    /// Topic receiving translation events.
    pub topic: String,
    /// Producer identity reported to the brokers.
    pub client_id: String,
    /// Upper bound on connecting and on each produce call.
    pub timeout: Duration,
}

struct Connection {
    // Owns the broker connections the partition clients share.
    _client: Client,
    partitions: Vec<PartitionClient>,
}

/// Event publisher backed by a Kafka cluster.
pub struct KafkaPublisher {
    config: KafkaConfig,
    connection: ArcSwapOption<Connection>,
}

impl KafkaPublisher {
    #[must_use]
    pub fn new(config: KafkaConfig) -> Self {
        Self {
            config,
            connection: ArcSwapOption::empty(),
        }
    }

    /// Whether `connect()` has succeeded and `disconnect()` has not run since.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.load().is_some()
    }

    async fn open(&self) -> Result<Connection, DependencyError> {
        if self.config.brokers.is_empty() {
            return Err(DependencyError::Configuration {
                component: COMPONENT,
                message: "no brokers configured".to_string(),
            });
        }

        let client = ClientBuilder::new(self.config.brokers.clone())
            .client_id(self.config.client_id.clone())
            .build()
            .await
            .map_err(|e| request_error(&e))?;

        let topics = client.list_topics().await.map_err(|e| request_error(&e))?;
        let topic = topics
            .into_iter()
            .find(|t| t.name == self.config.topic)
            .ok_or_else(|| DependencyError::Configuration {
                component: COMPONENT,
                message: format!("topic {} does not exist", self.config.topic),
            })?;
        if topic.partitions.is_empty() {
            return Err(DependencyError::Malformed {
                component: COMPONENT,
                message: format!("topic {} has no partitions", topic.name),
            });
        }

        let mut partitions = Vec::with_capacity(topic.partitions.len());
        for partition in topic.partitions {
            let partition_client = client
                .partition_client(
                    self.config.topic.clone(),
                    partition,
                    UnknownTopicHandling::Error,
                )
                .await
                .map_err(|e| request_error(&e))?;
            partitions.push(partition_client);
        }

        Ok(Connection {
            _client: client,
            partitions,
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn connect(&self) -> Result<(), DependencyError> {
        // The client retries unreachable brokers with backoff and no deadline.
        let connection = tokio::time::timeout(self.config.timeout, self.open())
            .await
            .map_err(|_| DependencyError::Request {
                component: COMPONENT,
                message: format!(
                    "no broker reachable within {:?} ({})",
                    self.config.timeout,
                    self.config.brokers.join(", ")
                ),
            })??;

        info!(
            brokers = ?self.config.brokers,
            topic = %self.config.topic,
            partitions = connection.partitions.len(),
            client_id = %self.config.client_id,
            "Kafka producer connected"
        );
        self.connection.store(Some(Arc::new(connection)));
        Ok(())
    }

    async fn publish(&self, event: &TranslationEvent) -> Result<(), PublishError> {
        let connection = self.connection.load_full().ok_or(PublishError::NotConnected)?;

        let key = event.key();
        let value = serde_json::to_vec(event).map_err(|e| PublishError::Encode(e.to_string()))?;
        let record = Record {
            key: Some(key.as_bytes().to_vec()),
            value: Some(value),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let index = partition_for(key.as_bytes(), connection.partitions.len());
        let partition = &connection.partitions[index];
        let offsets = tokio::time::timeout(
            self.config.timeout,
            partition.produce(vec![record], Compression::NoCompression),
        )
        .await
        .map_err(|_| PublishError::TimedOut(self.config.timeout))?
        .map_err(produce_error)?;

        let offset = first_offset(&offsets)?;
        debug!(partition = index, offset, key, "translation event produced");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DependencyError> {
        if self.connection.swap(None).is_some() {
            info!("Kafka producer disconnected");
        }
        Ok(())
    }
}

fn request_error(err: &KafkaError) -> DependencyError {
    DependencyError::Request {
        component: COMPONENT,
        message: err.to_string(),
    }
}

fn produce_error(err: KafkaError) -> PublishError {
    match err {
        KafkaError::InvalidResponse(message) => PublishError::Malformed(message),
        err @ KafkaError::ServerError { .. } => PublishError::Rejected(err.to_string()),
        err => PublishError::Request(err.to_string()),
    }
}

/// A single-record produce must report exactly one offset.
fn first_offset(offsets: &[i64]) -> Result<i64, PublishError> {
    match offsets {
        [offset] => Ok(*offset),
        other => Err(PublishError::Malformed(format!(
            "expected one offset, got {}",
            other.len()
        ))),
    }
}

/// Picks the partition for a keyed record: `toPositive(murmur2(key)) % n`.
fn partition_for(key: &[u8], partitions: usize) -> usize {
    // Masking keeps the value in 0..=i32::MAX, so the cast is lossless.
    #[allow(clippy::cast_sign_loss)]
    let hash = (murmur2(key) & 0x7fff_ffff) as usize;
    hash % partitions.max(1)
}

/// Kafka's murmur2 variant (seed `0x9747b28c`), as used by the Java client.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn murmur2(data: &[u8]) -> i32 {
    const SEED: u32 = 0x9747_b28c;
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let mut h = SEED ^ data.len() as u32;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= u32::from(tail[2]) << 16;
    }
    if tail.len() >= 2 {
        h ^= u32::from(tail[1]) << 8;
    }
    if let Some(&first) = tail.first() {
        h ^= u32::from(first);
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h as i32
}

#[cfg(test)]
mod tests {
    use lingo_core::{TranslationRequest, TranslationResult};

    use super::*;

    fn config(brokers: Vec<String>) -> KafkaConfig {
        KafkaConfig {
            brokers,
            topic: "translations".to_string(),
            client_id: "translation-svc".to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    fn event() -> TranslationEvent {
        TranslationEvent::now(
            &TranslationRequest::new("Hello", "DE"),
            &TranslationResult::new("Hallo", "EN"),
        )
    }

    fn dead_broker() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    #[test]
    fn murmur2_matches_java_client() {
        assert_eq!(murmur2(b"21"), -973_932_308);
        assert_eq!(murmur2(b"foobar"), -790_332_482);
        assert_eq!(murmur2(b"a-little-bit-long-string"), -985_981_536);
        assert_eq!(murmur2(b"a-little-bit-longer-string"), -1_486_304_829);
        assert_eq!(
            murmur2(b"lkjh234lh9fiuh90y23oiuhsafujhadof229phr9h19h89h8"),
            -58_897_971
        );
        assert_eq!(murmur2(b"abc"), 479_470_107);
    }

    #[test]
    fn same_key_always_lands_on_same_partition() {
        assert_eq!(partition_for(b"u1", 3), 1);
        assert_eq!(partition_for(b"anonymous", 3), 1);
        assert_eq!(partition_for(b"u1", 1), 0);
        for n in 1..8 {
            assert!(partition_for(b"foobar", n) < n);
        }
    }

    #[test]
    fn produce_reply_without_single_offset_is_malformed() {
        assert_eq!(first_offset(&[42]), Ok(42));
        assert!(matches!(first_offset(&[]), Err(PublishError::Malformed(_))));
        assert!(matches!(
            first_offset(&[1, 2]),
            Err(PublishError::Malformed(_))
        ));
    }

    #[test]
    fn undecodable_broker_reply_is_malformed_not_request() {
        let err = produce_error(KafkaError::InvalidResponse("truncated frame".to_string()));
        assert_eq!(err, PublishError::Malformed("truncated frame".to_string()));
    }

    #[tokio::test]
    async fn publish_before_connect_fails() {
        let publisher = KafkaPublisher::new(config(vec![dead_broker()]));
        let err = publisher.publish(&event()).await.unwrap_err();
        assert_eq!(err, PublishError::NotConnected);
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_noop() {
        let publisher = KafkaPublisher::new(config(vec![dead_broker()]));
        assert!(publisher.disconnect().await.is_ok());
        assert!(!publisher.is_connected());
    }

    #[tokio::test]
    async fn connect_without_brokers_is_a_configuration_error() {
        let publisher = KafkaPublisher::new(config(vec![]));
        let err = publisher.connect().await.unwrap_err();
        assert!(matches!(err, DependencyError::Configuration { .. }));
    }

    #[tokio::test]
    async fn connect_to_unreachable_broker_is_bounded() {
        let publisher = KafkaPublisher::new(config(vec![dead_broker()]));
        let started = std::time::Instant::now();
        let err = tokio::time::timeout(Duration::from_secs(10), publisher.connect())
            .await
            .expect("connect should give up on its own")
            .unwrap_err();
        assert!(matches!(err, DependencyError::Request { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!publisher.is_connected());
    }
}
