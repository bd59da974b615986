//! Session-start request and response.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Body of `POST /session/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStartRequest {
    /// Role identifier.
    pub role: String,
    pub candidate_name: String,
    pub user_email: String,
}

impl SessionStartRequest {
    /// Validate inputs the way the start button does before calling out.
    pub fn new(
        role: &str,
        candidate_name: &str,
        user_email: Option<&str>,
    ) -> Result<Self, SessionError> {
        let role = role.trim();
        if role.is_empty() {
            return Err(SessionError::MissingRole);
        }
        let candidate_name = candidate_name.trim();
        if candidate_name.is_empty() {
            return Err(SessionError::MissingCandidate);
        }
        let user_email = user_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(SessionError::NotAuthenticated)?;

        Ok(Self {
            role: role.to_string(),
            candidate_name: candidate_name.to_string(),
            user_email: user_email.to_string(),
        })
    }
}

/// Credentials for the voice call, returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartResponse {
    pub session_id: String,
    /// Scenario text read to the candidate.
    #[serde(default)]
    pub scenario: String,
    /// Public key for the voice-call client.
    pub public_key: String,
    /// Assistant the call is placed with.
    pub assistant_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_request_is_trimmed() {
        let req = SessionStartRequest::new("pm", "  Jo  ", Some("jo@example.com")).unwrap();
        assert_eq!(req.candidate_name, "Jo");
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["candidate_name"], "Jo");
        assert_eq!(body["user_email"], "jo@example.com");
    }

    #[test]
    fn rejects_missing_inputs() {
        assert_eq!(
            SessionStartRequest::new("", "Jo", Some("a@b")),
            Err(SessionError::MissingRole)
        );
        assert_eq!(
            SessionStartRequest::new("pm", "   ", Some("a@b")),
            Err(SessionError::MissingCandidate)
        );
        assert_eq!(
            SessionStartRequest::new("pm", "Jo", None),
            Err(SessionError::NotAuthenticated)
        );
    }

    #[test]
    fn response_uses_camel_case() {
        let resp: SessionStartResponse = serde_json::from_str(
            r#"{"sessionId":"s1","scenario":"Kickoff","publicKey":"pk","assistantId":"as"}"#,
        )
        .unwrap();
        assert_eq!(resp.session_id, "s1");
        assert_eq!(resp.assistant_id, "as");
    }
}
