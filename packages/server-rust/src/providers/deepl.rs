//! DeepL REST API client.
//!
//! The client is constructed with its settings but holds no HTTP session
//! until [`TranslationProvider::init`] runs; calls made before that fail with
//! [`DependencyError::NotInitialized`].

use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use lingo_core::{DependencyError, Language, TranslationProvider, TranslationResult};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::info;

const COMPONENT: &str = "deepl";
const FREE_API_URL: &str = "https://api-free.deepl.com";
const PRO_API_URL: &str = "https://api.deepl.com";

/// Settings for [`DeepLClient`].
#[derive(Debug, Clone)]
pub struct DeepLConfig {
    /// DeepL authentication key. Keys ending in `:fx` belong to the free tier.
    pub api_key: String,
    /// Overrides the API base URL derived from the key.
    pub base_url: Option<String>,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

impl DeepLConfig {
    /// Base URL the client talks to.
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.api_key.trim().ends_with(":fx") => FREE_API_URL.to_string(),
            None => PRO_API_URL.to_string(),
        }
    }
}

struct Session {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
}

/// Translation provider backed by the DeepL v2 API.
pub struct DeepLClient {
    config: DeepLConfig,
    session: ArcSwapOption<Session>,
}

impl DeepLClient {
    #[must_use]
    pub fn new(config: DeepLConfig) -> Self {
        Self {
            config,
            session: ArcSwapOption::empty(),
        }
    }

    fn session(&self) -> Result<std::sync::Arc<Session>, DependencyError> {
        self.session
            .load_full()
            .ok_or(DependencyError::NotInitialized {
                component: COMPONENT,
            })
    }
}

#[derive(Serialize)]
struct TranslateBody<'a> {
    text: [&'a str; 1],
    target_lang: &'a str,
}

#[derive(Deserialize)]
struct TranslateReply {
    translations: Vec<TranslationItem>,
}

#[derive(Deserialize)]
struct TranslationItem {
    detected_source_language: String,
    text: String,
}

#[derive(Deserialize)]
struct LanguageItem {
    language: String,
    name: String,
}

#[async_trait]
impl TranslationProvider for DeepLClient {
    async fn init(&self) -> Result<(), DependencyError> {
        let key = self.config.api_key.trim();
        if key.is_empty() {
            return Err(DependencyError::Configuration {
                component: COMPONENT,
                message: "API key is empty".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| DependencyError::Configuration {
                component: COMPONENT,
                message: e.to_string(),
            })?;

        let base_url = self.config.resolved_base_url();
        info!(base_url = %base_url, "DeepL client initialized");

        self.session.store(Some(std::sync::Arc::new(Session {
            http,
            base_url,
            authorization: format!("DeepL-Auth-Key {key}"),
        })));
        Ok(())
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<TranslationResult, DependencyError> {
        let session = self.session()?;

        let response = session
            .http
            .post(format!("{}/v2/translate", session.base_url))
            .header(AUTHORIZATION, &session.authorization)
            .json(&TranslateBody {
                text: [text],
                target_lang: target_language,
            })
            .send()
            .await
            .map_err(request_error)?;

        let reply: TranslateReply = decode(response).await?;
        let item = reply
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| DependencyError::Malformed {
                component: COMPONENT,
                message: "response contained no translations".to_string(),
            })?;

        Ok(TranslationResult::new(
            item.text,
            item.detected_source_language,
        ))
    }

    async fn supported_languages(&self) -> Result<Vec<Language>, DependencyError> {
        let session = self.session()?;

        let response = session
            .http
            .get(format!("{}/v2/languages", session.base_url))
            .query(&[("type", "target")])
            .header(AUTHORIZATION, &session.authorization)
            .send()
            .await
            .map_err(request_error)?;

        let items: Vec<LanguageItem> = decode(response).await?;
        Ok(items
            .into_iter()
            .map(|item| Language::new(item.language, item.name))
            .collect())
    }
}

fn request_error(err: reqwest::Error) -> DependencyError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    DependencyError::Request {
        component: COMPONENT,
        message,
    }
}

/// Maps non-success statuses to [`DependencyError::Status`] and decodes JSON bodies.
async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, DependencyError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = match status.as_u16() {
            403 => "authorization failed, check the API key".to_string(),
            429 => "too many requests".to_string(),
            456 => "quota exceeded".to_string(),
            _ if body.is_empty() => status.to_string(),
            _ => body,
        };
        return Err(DependencyError::Status {
            component: COMPONENT,
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| DependencyError::Malformed {
            component: COMPONENT,
            message: e.to_string(),
        })
}
