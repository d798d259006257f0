use lingo_core::{DependencyError, ValidationError};

/// Per-request failure as seen by the caller.
///
/// Every error a request can hit is folded into one of these before it
/// leaves the request handler; none of them affects other requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Caller input violates a precondition.
    #[error("{0}")]
    InvalidArgument(String),
    /// The provider failed or a handle was used before initialization.
    #[error("{0}")]
    Internal(String),
    /// The service is not admitting requests (starting up or draining).
    #[error("service is not accepting requests")]
    Unavailable,
}

impl RequestError {
    /// Stable machine-readable code used in error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Internal(_) => "internal",
            Self::Unavailable => "unavailable",
        }
    }
}

impl From<ValidationError> for RequestError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<DependencyError> for RequestError {
    fn from(err: DependencyError) -> Self {
        Self::Internal(err.to_string())
    }
}
