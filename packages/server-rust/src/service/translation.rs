//! Request handling for the Translate and `GetSupportedLanguages` operations.
//!
//! Each Translate call runs validate -> translate -> respond, then hands the
//! resulting event to the publisher on a detached task. The response never
//! waits for that task; its outcome is only logged and counted.

use std::sync::Arc;
use std::time::Duration;

use lingo_core::{
    EventPublisher, Language, TranslationEvent, TranslationProvider, TranslationRequest,
    TranslationResponse,
};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::error::RequestError;

/// Characters of source text included in request logs.
const LOG_PREVIEW_CHARS: usize = 50;

/// Shared request handler owning the provider and publisher handles.
///
/// Constructed once at startup and shared by `Arc` with every request.
pub struct TranslationService {
    provider: Arc<dyn TranslationProvider>,
    publisher: Arc<dyn EventPublisher>,
    publishes: TaskTracker,
}

impl TranslationService {
    #[must_use]
    pub fn new(provider: Arc<dyn TranslationProvider>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            provider,
            publisher,
            publishes: TaskTracker::new(),
        }
    }

    /// Translates one request and schedules its event.
    ///
    /// # Errors
    ///
    /// - [`RequestError::InvalidArgument`] when text or target language is blank;
    ///   no provider call and no publish happen.
    /// - [`RequestError::Internal`] when the provider call fails; nothing is published.
    pub async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, RequestError> {
        if let Err(err) = request.validate() {
            debug!(reason = %err, "rejecting translate request");
            metrics::counter!("lingo_translate_requests_total", "outcome" => "invalid_argument")
                .increment(1);
            return Err(err.into());
        }

        info!(
            text = %preview(&request.text),
            target = %request.target_language,
            user = request.requester().unwrap_or(lingo_core::ANONYMOUS_REQUESTER),
            "translate request"
        );

        let result = self
            .provider
            .translate(&request.text, &request.target_language)
            .await
            .map_err(|err| {
                error!(error = %err, "translation failed");
                metrics::counter!("lingo_translate_requests_total", "outcome" => "internal")
                    .increment(1);
                RequestError::from(err)
            })?;

        let response = TranslationResponse::from_result(&result, &request.target_language);
        self.publish_detached(TranslationEvent::now(&request, &result));

        metrics::counter!("lingo_translate_requests_total", "outcome" => "ok").increment(1);
        Ok(response)
    }

    /// Returns the provider's target languages unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Internal`] when the provider call fails.
    pub async fn supported_languages(&self) -> Result<Vec<Language>, RequestError> {
        debug!("supported languages request");
        self.provider.supported_languages().await.map_err(|err| {
            error!(error = %err, "listing supported languages failed");
            RequestError::from(err)
        })
    }

    /// Number of detached publishes that have not finished yet.
    #[must_use]
    pub fn pending_publishes(&self) -> usize {
        self.publishes.len()
    }

    /// Stops tracking new publishes and waits for the outstanding ones.
    ///
    /// Returns `false` if `timeout` expired first; those tasks keep running
    /// but are no longer waited for.
    pub async fn flush_publishes(&self, timeout: Duration) -> bool {
        self.publishes.close();
        tokio::time::timeout(timeout, self.publishes.wait())
            .await
            .is_ok()
    }

    fn publish_detached(&self, event: TranslationEvent) {
        let publisher = Arc::clone(&self.publisher);
        self.publishes.spawn(async move {
            match publisher.publish(&event).await {
                Ok(()) => {
                    debug!(key = event.key(), "published translation event");
                    metrics::counter!("lingo_events_published_total", "outcome" => "ok")
                        .increment(1);
                }
                Err(err) => {
                    warn!(key = event.key(), error = %err, "failed to publish translation event");
                    metrics::counter!("lingo_events_published_total", "outcome" => "error")
                        .increment(1);
                }
            }
        });
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use tokio::sync::Notify;

    use super::*;
    use crate::test_support::{RecordingPublisher, StubProvider};

    fn service(
        provider: &Arc<StubProvider>,
        publisher: &Arc<RecordingPublisher>,
    ) -> TranslationService {
        TranslationService::new(
            Arc::clone(provider) as Arc<dyn TranslationProvider>,
            Arc::clone(publisher) as Arc<dyn EventPublisher>,
        )
    }

    #[tokio::test]
    async fn translate_returns_result_and_publishes_event() {
        let provider = Arc::new(StubProvider::ok("Hallo", "EN"));
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(&provider, &publisher);

        let response = svc
            .translate(TranslationRequest::new("Hello", "DE").with_user_id("u1"))
            .await
            .unwrap();

        assert_eq!(
            response,
            TranslationResponse {
                translated_text: "Hallo".to_string(),
                detected_source_language: "EN".to_string(),
                target_language: "DE".to_string(),
            }
        );

        assert!(svc.flush_publishes(Duration::from_secs(1)).await);
        let events = publisher.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.source_text, "Hello");
        assert_eq!(event.translated_text, "Hallo");
        assert_eq!(event.source_language, "EN");
        assert_eq!(event.target_language, "DE");
        assert!(!event.timestamp.is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_side_effects() {
        let provider = Arc::new(StubProvider::ok("Hallo", "EN"));
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(&provider, &publisher);

        for text in ["", "   ", "\n\t"] {
            let err = svc
                .translate(TranslationRequest::new(text, "DE"))
                .await
                .unwrap_err();
            assert!(matches!(&err, RequestError::InvalidArgument(msg) if msg.contains("text")));
        }

        assert!(svc.flush_publishes(Duration::from_secs(1)).await);
        assert_eq!(provider.calls(), 0);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn empty_target_language_is_rejected_without_side_effects() {
        let provider = Arc::new(StubProvider::ok("Hallo", "EN"));
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(&provider, &publisher);

        let err = svc
            .translate(TranslationRequest::new("Hello", "  "))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RequestError::InvalidArgument("target language is required".to_string())
        );

        assert!(svc.flush_publishes(Duration::from_secs(1)).await);
        assert_eq!(provider.calls(), 0);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_internal_and_not_published() {
        let provider = Arc::new(StubProvider::failing("connection reset"));
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(&provider, &publisher);

        let err = svc
            .translate(TranslationRequest::new("Hello", "DE"))
            .await
            .unwrap_err();
        assert!(matches!(&err, RequestError::Internal(msg) if msg.contains("connection reset")));

        assert!(svc.flush_publishes(Duration::from_secs(1)).await);
        assert_eq!(provider.calls(), 1);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_request() {
        let provider = Arc::new(StubProvider::ok("Hallo", "EN"));
        let publisher = Arc::new(RecordingPublisher {
            fail_publish: true,
            ..RecordingPublisher::default()
        });
        let svc = service(&provider, &publisher);

        let response = svc
            .translate(TranslationRequest::new("Hello", "DE"))
            .await
            .unwrap();
        assert_eq!(response.translated_text, "Hallo");

        assert!(svc.flush_publishes(Duration::from_secs(1)).await);
        assert_eq!(publisher.events().len(), 1);

        // The shared handles remain usable for the next request.
        assert!(svc
            .translate(TranslationRequest::new("Bye", "DE"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn response_does_not_wait_for_publish() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(StubProvider::ok("Hallo", "EN"));
        let publisher = Arc::new(RecordingPublisher {
            gate: Some(Arc::clone(&gate)),
            ..RecordingPublisher::default()
        });
        let svc = service(&provider, &publisher);

        let response = tokio::time::timeout(
            Duration::from_secs(1),
            svc.translate(TranslationRequest::new("Hello", "DE")),
        )
        .await
        .expect("translate must not block on publish")
        .unwrap();
        assert_eq!(response.translated_text, "Hallo");
        assert_eq!(svc.pending_publishes(), 1);
        assert!(publisher.events().is_empty());

        gate.notify_one();
        assert!(svc.flush_publishes(Duration::from_secs(1)).await);
        assert_eq!(publisher.events().len(), 1);
        assert_eq!(svc.pending_publishes(), 0);
    }

    #[tokio::test]
    async fn flush_times_out_on_stuck_publish() {
        let provider = Arc::new(StubProvider::ok("Hallo", "EN"));
        let publisher = Arc::new(RecordingPublisher {
            gate: Some(Arc::new(Notify::new())),
            ..RecordingPublisher::default()
        });
        let svc = service(&provider, &publisher);

        svc.translate(TranslationRequest::new("Hello", "DE"))
            .await
            .unwrap();

        assert!(!svc.flush_publishes(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn supported_languages_passes_list_through_in_order() {
        let languages = vec![
            Language::new("DE", "German"),
            Language::new("FR", "French"),
            Language::new("ES", "Spanish"),
        ];
        let provider = Arc::new(StubProvider {
            languages: languages.clone(),
            ..StubProvider::ok("", "")
        });
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(&provider, &publisher);

        assert_eq!(svc.supported_languages().await.unwrap(), languages);
        assert_eq!(provider.calls(), 0);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn supported_languages_failure_is_internal() {
        let provider = Arc::new(StubProvider::failing("timed out"));
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(&provider, &publisher);

        let err = svc.supported_languages().await.unwrap_err();
        assert!(matches!(err, RequestError::Internal(msg) if msg.contains("timed out")));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let text = "\u{fc}".repeat(60);
        assert_eq!(preview(&text).chars().count(), LOG_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
