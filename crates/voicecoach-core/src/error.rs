//! Error types shared across voicecoach crates.
//!
//! Defined in `voicecoach-core` so the aggregator can classify retrieval
//! failures without string matching.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when fetching from the evaluation store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The requested user or role does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),
}

impl StoreError {
    /// Returns `true` if retrying the same request cannot succeed.
    ///
    /// Client errors are permanent, except request timeouts (408) and rate
    /// limiting (429).
    pub fn is_permanent(&self) -> bool {
        match self {
            StoreError::NotFound(_) | StoreError::Decode(_) => true,
            StoreError::Api { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            StoreError::Timeout(_) | StoreError::Network(_) => false,
        }
    }
}

/// A call event arrived in a state that cannot accept it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("cannot {event} while {state}")]
    InvalidTransition { state: String, event: String },

    /// The voice client has not been initialized.
    #[error("voice client not initialized")]
    NotInitialized,

    /// The voice client rejected a request.
    #[error("voice client error: {0}")]
    Client(String),
}

/// Reasons a session cannot be started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("please select a role")]
    MissingRole,

    #[error("please enter a candidate name")]
    MissingCandidate,

    #[error("user not authenticated")]
    NotAuthenticated,
}
