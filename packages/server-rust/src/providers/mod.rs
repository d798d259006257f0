//! Translation provider clients.

pub mod deepl;

pub use deepl::{DeepLClient, DeepLConfig};
