//! Input validation for translation requests.

/// Caller-supplied input that violates a request precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("text is required")]
    MissingText,
    #[error("target language is required")]
    MissingTargetLanguage,
}

/// Validates the two mandatory request fields in order: text, then target.
///
/// # Errors
///
/// Returns the first violated precondition.
pub fn validate_request(text: &str, target_language: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::MissingText);
    }
    if target_language.trim().is_empty() {
        return Err(ValidationError::MissingTargetLanguage);
    }
    Ok(())
}
