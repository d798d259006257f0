//! Failure kinds of the two external collaborators.
//!
//! Both enums carry plain string messages so that concrete clients can map
//! their transport errors without this crate depending on an HTTP stack.

use std::time::Duration;

/// The translation provider or the bus connection failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    /// An operation was invoked before the handle was initialized.
    #[error("{component} is not initialized")]
    NotInitialized { component: &'static str },
    /// The handle cannot be initialized with the supplied settings.
    #[error("invalid {component} configuration: {message}")]
    Configuration {
        component: &'static str,
        message: String,
    },
    /// The remote call did not complete (connect error, reset, timeout).
    #[error("{component} request failed: {message}")]
    Request {
        component: &'static str,
        message: String,
    },
    /// The remote side answered with a non-success status.
    #[error("{component} responded with status {status}: {message}")]
    Status {
        component: &'static str,
        status: u16,
        message: String,
    },
    /// The remote side answered with data that cannot be used.
    #[error("{component} returned malformed data: {message}")]
    Malformed {
        component: &'static str,
        message: String,
    },
}

impl DependencyError {
    /// True when the error stems from an ordering defect rather than the remote side.
    #[must_use]
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized { .. })
    }
}

/// A single event could not be delivered to the bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("publisher is not connected")]
    NotConnected,
    #[error("failed to encode event: {0}")]
    Encode(String),
    /// The produce request never got an answer (connection lost, retries exhausted).
    #[error("publish request failed: {0}")]
    Request(String),
    /// The broker answered with an error code.
    #[error("broker rejected publish: {0}")]
    Rejected(String),
    /// The broker answered, but the reply could not be understood.
    #[error("broker returned a malformed produce reply: {0}")]
    Malformed(String),
    #[error("publish timed out after {0:?}")]
    TimedOut(Duration),
}
