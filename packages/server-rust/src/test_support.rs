//! In-process fakes of the provider and publisher shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lingo_core::{
    DependencyError, EventPublisher, Language, PublishError, TranslationEvent,
    TranslationProvider, TranslationResult,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Provider answering with fixed data; counts calls and can be slowed down.
pub struct StubProvider {
    pub result: Result<TranslationResult, DependencyError>,
    pub languages: Vec<Language>,
    pub delay: Option<Duration>,
    pub init_result: Result<(), DependencyError>,
    pub translate_calls: AtomicUsize,
    pub init_calls: AtomicUsize,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl StubProvider {
    pub fn ok(translated: &str, detected: &str) -> Self {
        Self {
            result: Ok(TranslationResult::new(translated, detected)),
            languages: Vec::new(),
            delay: None,
            init_result: Ok(()),
            translate_calls: AtomicUsize::new(0),
            init_calls: AtomicUsize::new(0),
            log: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(DependencyError::Request {
                component: "stub",
                message: message.to_string(),
            }),
            ..Self::ok("", "")
        }
    }

    pub fn calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for StubProvider {
    async fn init(&self) -> Result<(), DependencyError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("provider:init".to_string());
        self.init_result.clone()
    }

    async fn translate(
        &self,
        text: &str,
        _target_language: &str,
    ) -> Result<TranslationResult, DependencyError> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("provider:translate:{text}"));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }

    async fn supported_languages(&self) -> Result<Vec<Language>, DependencyError> {
        match &self.result {
            Ok(_) => Ok(self.languages.clone()),
            Err(err) => Err(err.clone()),
        }
    }
}

/// Publisher recording every call; can fail publishes or hold them on a gate.
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<TranslationEvent>>,
    pub fail_publish: bool,
    pub fail_connect: bool,
    pub gate: Option<Arc<Notify>>,
    /// When set, `disconnect` sleeps this long before returning.
    pub disconnect_delay: Option<Duration>,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<TranslationEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn connect(&self) -> Result<(), DependencyError> {
        self.log.lock().push("publisher:connect".to_string());
        if self.fail_connect {
            return Err(DependencyError::Request {
                component: "stub",
                message: "broker unreachable".to_string(),
            });
        }
        Ok(())
    }

    async fn publish(&self, event: &TranslationEvent) -> Result<(), PublishError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.events.lock().push(event.clone());
        self.log
            .lock()
            .push(format!("publisher:publish:{}", event.source_text));
        if self.fail_publish {
            Err(PublishError::Request("broker down".to_string()))
        } else {
            Ok(())
        }
    }

    async fn disconnect(&self) -> Result<(), DependencyError> {
        self.log.lock().push("publisher:disconnect".to_string());
        if let Some(delay) = self.disconnect_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
