//! Seams to the external backend.
//!
//! These async traits are implemented by `voicecoach-client` over HTTP and
//! by the in-memory mock used in tests.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{EvaluationRecord, Role};
use crate::session::{SessionStartRequest, SessionStartResponse};

// ---------------------------------------------------------------------------
// Evaluation store
// ---------------------------------------------------------------------------

/// Read-only access to roles and evaluation history.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Human-readable store name (e.g. "http").
    fn name(&self) -> &str;

    /// The ordered role catalog.
    async fn roles(&self) -> Result<Vec<Role>, StoreError>;

    /// All evaluations for a user, every role combined.
    async fn evaluations(&self, user: &str) -> Result<Vec<EvaluationRecord>, StoreError>;

    /// Evaluations for a user filtered to one role.
    async fn role_evaluations(
        &self,
        user: &str,
        role_id: &str,
    ) -> Result<Vec<EvaluationRecord>, StoreError>;
}

// ---------------------------------------------------------------------------
// Session backend
// ---------------------------------------------------------------------------

/// Creates evaluation sessions and hands back voice-call credentials.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn start_session(
        &self,
        request: &SessionStartRequest,
    ) -> Result<SessionStartResponse, StoreError>;
}
