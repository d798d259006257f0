//! Lingo core: translation domain types, validation, and collaborator contracts.

pub mod error;
pub mod traits;
pub mod types;
pub mod validation;

pub use error::{DependencyError, PublishError};
pub use traits::{EventPublisher, TranslationProvider};
pub use types::{
    Language, SupportedLanguages, TranslationEvent, TranslationRequest, TranslationResponse,
    TranslationResult, ANONYMOUS_REQUESTER,
};
pub use validation::{validate_request, ValidationError};
