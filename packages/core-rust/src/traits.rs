use async_trait::async_trait;

use crate::error::{DependencyError, PublishError};
use crate::types::{Language, TranslationEvent, TranslationResult};

/// Handle to the external translation provider.
/// Implementations: DeepL over HTTP, in-process fakes (tests).
///
/// One instance is shared by every in-flight request, so implementations must
/// not keep per-call mutable state.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Supplies credentials and builds the underlying client. Called once at startup.
    async fn init(&self) -> Result<(), DependencyError>;

    /// Translates `text` into `target_language`, auto-detecting the source.
    /// Exactly one remote attempt per call.
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<TranslationResult, DependencyError>;

    /// Lists supported target languages in provider order.
    async fn supported_languages(&self) -> Result<Vec<Language>, DependencyError>;
}

/// Producer side of the message bus carrying translation events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Opens the producer. Called once at startup, before the first publish.
    async fn connect(&self) -> Result<(), DependencyError>;

    /// Delivers one event. Safe to call concurrently; no ordering between calls.
    async fn publish(&self, event: &TranslationEvent) -> Result<(), PublishError>;

    /// Flushes and closes the producer. A no-op when never connected.
    async fn disconnect(&self) -> Result<(), DependencyError>;
}
