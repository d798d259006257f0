//! Request handling for the translation operations.
//!
//! - [`translation`]: validate -> translate -> respond -> detached publish
//! - [`error`]: the caller-facing error taxonomy

pub mod error;
pub mod translation;

pub use error::RequestError;
pub use translation::TranslationService;
