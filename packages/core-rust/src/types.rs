//! Translation domain types shared by the server and its collaborators.
//!
//! Field names on the wire are `snake_case` to stay compatible with the
//! existing gateway and history consumers of the event topic.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Key used on the event topic when a request carries no requester id.
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// Inbound unary translation request.
///
/// Missing fields deserialize to empty strings so that the validation step,
/// not the decoder, decides what is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Text to translate.
    #[serde(default)]
    pub text: String,
    /// Target language code (e.g. `"DE"`).
    #[serde(default)]
    pub target_language: String,
    /// Optional identity of the caller, used as the event key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl TranslationRequest {
    /// Creates a request without a requester id.
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            user_id: None,
        }
    }

    /// Attaches a requester id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Checks that both text and target language are non-empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingText`] first, then
    /// [`ValidationError::MissingTargetLanguage`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::validation::validate_request(&self.text, &self.target_language)
    }

    /// The requester id, if present and not blank. Non-blank ids are
    /// returned exactly as sent.
    #[must_use]
    pub fn requester(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}

/// Outcome of a single successful provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub translated_text: String,
    pub detected_source_language: String,
}

impl TranslationResult {
    pub fn new(
        translated_text: impl Into<String>,
        detected_source_language: impl Into<String>,
    ) -> Self {
        Self {
            translated_text: translated_text.into(),
            detected_source_language: detected_source_language.into(),
        }
    }
}

/// Response returned to the caller of the Translate operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub translated_text: String,
    pub detected_source_language: String,
    pub target_language: String,
}

impl TranslationResponse {
    /// Builds the response from the provider result and the requested target.
    #[must_use]
    pub fn from_result(result: &TranslationResult, target_language: &str) -> Self {
        Self {
            translated_text: result.translated_text.clone(),
            detected_source_language: result.detected_source_language.clone(),
            target_language: target_language.to_string(),
        }
    }
}

/// A language the provider can translate into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

impl Language {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Response body of the `GetSupportedLanguages` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedLanguages {
    pub languages: Vec<Language>,
}

/// Side-channel record describing one successful translation.
///
/// Built from a request and its result, handed to the publisher and then
/// dropped. `user_id` always holds either the requester id or
/// [`ANONYMOUS_REQUESTER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEvent {
    pub user_id: String,
    pub source_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    /// RFC 3339 / ISO-8601 UTC timestamp with millisecond precision.
    pub timestamp: String,
}

impl TranslationEvent {
    /// Derives the event for `request` and `result`, stamped with `at`.
    #[must_use]
    pub fn new(
        request: &TranslationRequest,
        result: &TranslationResult,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: request
                .requester()
                .unwrap_or(ANONYMOUS_REQUESTER)
                .to_string(),
            source_text: request.text.clone(),
            translated_text: result.translated_text.clone(),
            source_language: result.detected_source_language.clone(),
            target_language: request.target_language.clone(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Derives the event stamped with the current wall-clock time.
    #[must_use]
    pub fn now(request: &TranslationRequest, result: &TranslationResult) -> Self {
        Self::new(request, result, Utc::now())
    }

    /// Partition key on the event topic.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.user_id
    }
}
