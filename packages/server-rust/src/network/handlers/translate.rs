//! Translation endpoints: `POST /v1/translate` and `GET /v1/languages`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use lingo_core::{SupportedLanguages, TranslationRequest, TranslationResponse};

use super::AppState;
use crate::service::RequestError;

/// Translates one request.
///
/// A body that is not a JSON object of the expected shape is an invalid
/// argument, reported with the same error body as a blank field.
pub async fn translate_handler(
    State(state): State<AppState>,
    body: Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, RequestError> {
    let Json(request) = body.map_err(|rejection| RequestError::InvalidArgument(rejection.body_text()))?;
    let response = state.service.translate(request).await?;
    Ok(Json(response))
}

/// Lists the provider's target languages in provider order.
pub async fn languages_handler(
    State(state): State<AppState>,
) -> Result<Json<SupportedLanguages>, RequestError> {
    let languages = state.service.supported_languages().await?;
    Ok(Json(SupportedLanguages { languages }))
}
