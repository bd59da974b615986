//! HTTP implementation of the evaluation store and session backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use voicecoach_core::error::StoreError;
use voicecoach_core::model::{EvaluationList, EvaluationRecord, Role};
use voicecoach_core::session::{SessionStartRequest, SessionStartResponse};
use voicecoach_core::traits::{EvaluationStore, SessionBackend};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Client for the coaching backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
}

/// FastAPI-style error body.
#[derive(Deserialize)]
struct ApiErrorBody {
    detail: String,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        let base_url = Url::parse(base)
            .map_err(|e| anyhow::anyhow!("invalid API URL '{base}': {e}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API URL '{base}' cannot be used as a base");
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn map_send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else if e.is_connect() {
            StoreError::Network(format!(
                "backend not reachable at {}: {e}",
                self.base_url
            ))
        } else {
            StoreError::Network(e.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, StoreError> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = check_status(response, url.path()).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, StoreError> {
    let status = response.status().as_u16();
    if status == 404 {
        return Err(StoreError::NotFound(what.to_string()));
    }
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.detail)
            .unwrap_or(body);
        return Err(StoreError::Api { status, message });
    }
    Ok(response)
}

#[async_trait]
impl EvaluationStore for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn roles(&self) -> Result<Vec<Role>, StoreError> {
        self.get_json(self.endpoint(&["roles"])).await
    }

    #[instrument(skip(self))]
    async fn evaluations(&self, user: &str) -> Result<Vec<EvaluationRecord>, StoreError> {
        let list: EvaluationList = self.get_json(self.endpoint(&["evaluations", user])).await?;
        Ok(list.evaluations)
    }

    #[instrument(skip(self))]
    async fn role_evaluations(
        &self,
        user: &str,
        role_id: &str,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        let url = self.endpoint(&["evaluations", user, "role", role_id]);
        let list: EvaluationList = self.get_json(url).await?;
        Ok(list.evaluations)
    }
}

#[async_trait]
impl SessionBackend for HttpStore {
    #[instrument(skip(self, request), fields(role = %request.role))]
    async fn start_session(
        &self,
        request: &SessionStartRequest,
    ) -> Result<SessionStartResponse, StoreError> {
        let url = self.endpoint(&["session", "start"]);
        let response = self
            .client
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = check_status(response, url.path()).await?;
        response
            .json::<SessionStartResponse>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}
