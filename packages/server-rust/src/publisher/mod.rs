//! Event publishers for the translation event topic.

pub mod kafka;

pub use kafka::{KafkaConfig, KafkaPublisher};
