//! In-memory store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use voicecoach_core::error::StoreError;
use voicecoach_core::model::{EvaluationRecord, Role};
use voicecoach_core::session::{SessionStartRequest, SessionStartResponse};
use voicecoach_core::traits::{EvaluationStore, SessionBackend};

/// A mock backend for exercising the aggregator without a server.
///
/// Per-role responses can be set to records or to an error; the combined
/// endpoint returns every stored record.
pub struct MockStore {
    roles: Vec<Role>,
    histories: HashMap<String, Result<Vec<EvaluationRecord>, StoreError>>,
    /// Number of evaluation calls made.
    call_count: AtomicU32,
    /// Last session request received.
    last_session: Mutex<Option<SessionStartRequest>>,
}

impl MockStore {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles,
            histories: HashMap::new(),
            call_count: AtomicU32::new(0),
            last_session: Mutex::new(None),
        }
    }

    /// Serve `records` for `role_id`.
    pub fn with_history(mut self, role_id: &str, records: Vec<EvaluationRecord>) -> Self {
        self.histories.insert(role_id.to_string(), Ok(records));
        self
    }

    /// Fail every request for `role_id` with `error`.
    pub fn with_failure(mut self, role_id: &str, error: StoreError) -> Self {
        self.histories.insert(role_id.to_string(), Err(error));
        self
    }

    /// Number of evaluation requests served.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last session request received.
    pub fn last_session(&self) -> Option<SessionStartRequest> {
        self.last_session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl EvaluationStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.roles.clone())
    }

    async fn evaluations(&self, _user: &str) -> Result<Vec<EvaluationRecord>, StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let mut all = Vec::new();
        for role in &self.roles {
            match self.histories.get(&role.id) {
                Some(Ok(records)) => all.extend(records.iter().cloned()),
                Some(Err(e)) => return Err(e.clone()),
                None => {}
            }
        }
        Ok(all)
    }

    async fn role_evaluations(
        &self,
        _user: &str,
        role_id: &str,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.histories
            .get(role_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl SessionBackend for MockStore {
    async fn start_session(
        &self,
        request: &SessionStartRequest,
    ) -> Result<SessionStartResponse, StoreError> {
        *self.last_session.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        Ok(SessionStartResponse {
            session_id: format!("mock-{}", request.role),
            scenario: String::new(),
            public_key: "mock-public-key".into(),
            assistant_id: "mock-assistant".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unknown_role_is_empty() {
        let store = MockStore::new(vec![Role::new("pm", "PM")]);
        let records = store.role_evaluations("u", "pm").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn failure_is_returned() {
        let store = MockStore::new(vec![Role::new("pm", "PM")])
            .with_failure("pm", StoreError::Timeout(Duration::from_secs(10)));
        let err = store.role_evaluations("u", "pm").await.unwrap_err();
        assert_eq!(err, StoreError::Timeout(Duration::from_secs(10)));
        assert!(store.evaluations("u").await.is_err());
    }

    #[tokio::test]
    async fn records_session_requests() {
        let store = MockStore::new(vec![]);
        let request = SessionStartRequest::new("tl", "Kim", Some("kim@example.com")).unwrap();
        let response = store.start_session(&request).await.unwrap();
        assert_eq!(response.session_id, "mock-tl");
        assert_eq!(store.last_session(), Some(request));
    }
}
