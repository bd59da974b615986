//! Voice-call lifecycle.
//!
//! The real-time call itself belongs to an external SDK. This module owns
//! the state machine driven by its events and the single lazily created
//! client behind it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::CallError;

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Connecting,
    Active,
    Ending,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Idle => "idle",
            CallState::Connecting => "connecting",
            CallState::Active => "active",
            CallState::Ending => "ending",
        };
        f.write_str(s)
    }
}

/// Inputs to the state machine: user intents and SDK callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// The user asked to start a call.
    StartRequested,
    /// SDK: call-start.
    CallStarted,
    /// The user asked to hang up.
    StopRequested,
    /// SDK: call-end.
    CallEnded,
    /// SDK: error.
    Failed(String),
}

impl CallEvent {
    fn verb(&self) -> &'static str {
        match self {
            CallEvent::StartRequested => "start",
            CallEvent::CallStarted => "accept call-start",
            CallEvent::StopRequested => "stop",
            CallEvent::CallEnded => "accept call-end",
            CallEvent::Failed(_) => "fail",
        }
    }
}

/// Follow-up work the caller should perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEffect {
    /// A call that went live has ended; evaluation stats are stale.
    RefreshStats,
}

/// State machine for one tab's call.
#[derive(Debug, Default)]
pub struct CallSession {
    state: CallState,
    active_since: Option<Instant>,
    went_live: bool,
    last_error: Option<String>,
}

impl CallSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Message of the most recent failure, cleared when a call goes live.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Time since the call went live, zero when not live.
    pub fn elapsed(&self) -> Duration {
        match (self.state, self.active_since) {
            (CallState::Active | CallState::Ending, Some(since)) => since.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Apply an event, returning any follow-up effect.
    pub fn apply(&mut self, event: CallEvent) -> Result<Option<CallEffect>, CallError> {
        use CallEvent::*;
        use CallState::*;

        let (next, effect) = match (self.state, &event) {
            (Idle, StartRequested) => (Connecting, None),
            (Connecting, CallStarted) => {
                self.active_since = Some(Instant::now());
                self.went_live = true;
                self.last_error = None;
                (Active, None)
            }
            (Connecting | Active, StopRequested) => (Ending, None),
            (Connecting | Active | Ending, CallEnded) => {
                let effect = self.went_live.then_some(CallEffect::RefreshStats);
                (Idle, effect)
            }
            (_, Failed(message)) => {
                tracing::warn!(state = %self.state, "call failed: {message}");
                self.last_error = Some(message.clone());
                (Idle, None)
            }
            (state, event) => {
                return Err(CallError::InvalidTransition {
                    state: state.to_string(),
                    event: event.verb().to_string(),
                })
            }
        };

        tracing::debug!(from = %self.state, to = %next, "call transition");
        if next == Idle {
            self.active_since = None;
            self.went_live = false;
        }
        self.state = next;
        Ok(effect)
    }
}

/// Format a call duration as `m:ss`.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// The external real-time calling SDK.
#[async_trait]
pub trait VoiceClient: Send + Sync {
    async fn start(&self, assistant_id: &str) -> Result<(), CallError>;
    async fn stop(&self) -> Result<(), CallError>;
}

type ClientFactory<C> = Box<dyn Fn(&str) -> Result<C, CallError> + Send + Sync>;

/// Owns the one call client for this tab, created on first use.
pub struct CallService<C: VoiceClient> {
    factory: ClientFactory<C>,
    client: Option<C>,
    session: CallSession,
}

impl<C: VoiceClient> CallService<C> {
    /// `factory` builds a client from the backend-issued public key.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str) -> Result<C, CallError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            client: None,
            session: CallSession::new(),
        }
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    /// Create the client if it does not exist yet. Later keys are ignored.
    pub fn ensure_initialized(&mut self, public_key: &str) -> Result<&C, CallError> {
        if self.client.is_none() {
            tracing::debug!("creating voice client");
            self.client = Some((self.factory)(public_key)?);
        }
        self.client.as_ref().ok_or(CallError::NotInitialized)
    }

    /// Place a call with `assistant_id`.
    pub async fn start(&mut self, assistant_id: &str) -> Result<(), CallError> {
        let Some(client) = self.client.as_ref() else {
            return Err(CallError::NotInitialized);
        };
        self.session.apply(CallEvent::StartRequested)?;
        if let Err(e) = client.start(assistant_id).await {
            self.session.apply(CallEvent::Failed(e.to_string()))?;
            return Err(e);
        }
        Ok(())
    }

    /// Hang up.
    pub async fn stop(&mut self) -> Result<(), CallError> {
        let Some(client) = self.client.as_ref() else {
            return Err(CallError::NotInitialized);
        };
        self.session.apply(CallEvent::StopRequested)?;
        if let Err(e) = client.stop().await {
            self.session.apply(CallEvent::Failed(e.to_string()))?;
            return Err(e);
        }
        Ok(())
    }

    /// Feed an SDK callback into the state machine.
    pub fn handle(&mut self, event: CallEvent) -> Result<Option<CallEffect>, CallError> {
        self.session.apply(event)
    }

    /// Stop any live call and drop the client.
    pub async fn dispose(&mut self) {
        if let Some(client) = self.client.take() {
            if self.session.state() != CallState::Idle {
                if let Err(e) = client.stop().await {
                    tracing::warn!("failed to stop call during dispose: {e}");
                }
            }
        }
        self.session = CallSession::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        created: AtomicU32,
        started: AtomicU32,
        stopped: AtomicU32,
    }

    struct FakeClient {
        counters: Arc<Counters>,
        fail_start: bool,
        fail_stop: bool,
    }

    #[async_trait]
    impl VoiceClient for FakeClient {
        async fn start(&self, _assistant_id: &str) -> Result<(), CallError> {
            if self.fail_start {
                return Err(CallError::Client("microphone denied".into()));
            }
            self.counters.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), CallError> {
            if self.fail_stop {
                return Err(CallError::Client("transport closed".into()));
            }
            self.counters.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(fail_start: bool) -> (CallService<FakeClient>, Arc<Counters>) {
        failing_service(fail_start, false)
    }

    fn failing_service(
        fail_start: bool,
        fail_stop: bool,
    ) -> (CallService<FakeClient>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let shared = Arc::clone(&counters);
        let svc = CallService::new(move |_key: &str| {
            shared.created.fetch_add(1, Ordering::SeqCst);
            Ok(FakeClient {
                counters: Arc::clone(&shared),
                fail_start,
                fail_stop,
            })
        });
        (svc, counters)
    }

    #[test]
    fn full_call_requests_refresh() {
        let mut session = CallSession::new();
        assert_eq!(session.apply(CallEvent::StartRequested), Ok(None));
        assert_eq!(session.state(), CallState::Connecting);
        assert_eq!(session.apply(CallEvent::CallStarted), Ok(None));
        assert_eq!(session.state(), CallState::Active);
        assert_eq!(session.apply(CallEvent::StopRequested), Ok(None));
        assert_eq!(session.state(), CallState::Ending);
        assert_eq!(
            session.apply(CallEvent::CallEnded),
            Ok(Some(CallEffect::RefreshStats))
        );
        assert_eq!(session.state(), CallState::Idle);
    }

    #[test]
    fn remote_hangup_from_active_requests_refresh() {
        let mut session = CallSession::new();
        session.apply(CallEvent::StartRequested).unwrap();
        session.apply(CallEvent::CallStarted).unwrap();
        assert_eq!(
            session.apply(CallEvent::CallEnded),
            Ok(Some(CallEffect::RefreshStats))
        );
    }

    #[test]
    fn call_that_never_connected_does_not_refresh() {
        let mut session = CallSession::new();
        session.apply(CallEvent::StartRequested).unwrap();
        session.apply(CallEvent::StopRequested).unwrap();
        assert_eq!(session.apply(CallEvent::CallEnded), Ok(None));
        assert_eq!(session.state(), CallState::Idle);
    }

    #[test]
    fn error_returns_to_idle_and_is_kept() {
        let mut session = CallSession::new();
        session.apply(CallEvent::StartRequested).unwrap();
        session.apply(CallEvent::CallStarted).unwrap();
        assert_eq!(session.apply(CallEvent::Failed("dropped".into())), Ok(None));
        assert_eq!(session.state(), CallState::Idle);
        assert_eq!(session.last_error(), Some("dropped"));

        session.apply(CallEvent::StartRequested).unwrap();
        session.apply(CallEvent::CallStarted).unwrap();
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut session = CallSession::new();
        let err = session.apply(CallEvent::StopRequested).unwrap_err();
        assert_eq!(err.to_string(), "cannot stop while idle");
        assert!(session.apply(CallEvent::CallEnded).is_err());

        session.apply(CallEvent::StartRequested).unwrap();
        assert!(session.apply(CallEvent::StartRequested).is_err());
        assert_eq!(session.state(), CallState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_tracks_live_time() {
        let mut session = CallSession::new();
        session.apply(CallEvent::StartRequested).unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(session.elapsed(), Duration::ZERO);
        session.apply(CallEvent::CallStarted).unwrap();
        tokio::time::advance(Duration::from_secs(75)).await;
        assert_eq!(format_duration(session.elapsed()), "1:15");
        session.apply(CallEvent::CallEnded).unwrap();
        assert_eq!(session.elapsed(), Duration::ZERO);
    }

    #[test]
    fn format_pads_seconds() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(9)), "0:09");
        assert_eq!(format_duration(Duration::from_secs(600)), "10:00");
    }

    #[tokio::test]
    async fn client_is_created_once() {
        let (mut svc, counters) = service(false);
        assert!(!svc.is_initialized());
        svc.ensure_initialized("pk-1").unwrap();
        svc.ensure_initialized("pk-2").unwrap();
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);

        svc.start("assistant").await.unwrap();
        assert_eq!(svc.session().state(), CallState::Connecting);
        assert_eq!(svc.handle(CallEvent::CallStarted).unwrap(), None);
        svc.stop().await.unwrap();
        assert_eq!(
            svc.handle(CallEvent::CallEnded).unwrap(),
            Some(CallEffect::RefreshStats)
        );
        assert_eq!(counters.started.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_requires_initialization() {
        let (mut svc, _) = service(false);
        assert_eq!(svc.start("assistant").await, Err(CallError::NotInitialized));
        assert_eq!(svc.session().state(), CallState::Idle);
    }

    #[tokio::test]
    async fn failed_start_returns_to_idle() {
        let (mut svc, _) = service(true);
        svc.ensure_initialized("pk").unwrap();
        let err = svc.start("assistant").await.unwrap_err();
        assert_eq!(err, CallError::Client("microphone denied".into()));
        assert_eq!(svc.session().state(), CallState::Idle);
        assert!(svc.session().last_error().is_some());
    }

    #[tokio::test]
    async fn failed_stop_returns_to_idle() {
        let (mut svc, counters) = failing_service(false, true);
        svc.ensure_initialized("pk").unwrap();
        svc.start("assistant").await.unwrap();
        svc.handle(CallEvent::CallStarted).unwrap();

        let err = svc.stop().await.unwrap_err();
        assert_eq!(err, CallError::Client("transport closed".into()));
        assert_eq!(svc.session().state(), CallState::Idle);
        assert_eq!(
            svc.session().last_error(),
            Some("voice client error: transport closed")
        );
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 0);

        // a fresh call can be placed right away
        svc.start("assistant").await.unwrap();
        assert_eq!(svc.session().state(), CallState::Connecting);
    }

    #[tokio::test]
    async fn dispose_stops_live_call_and_drops_client() {
        let (mut svc, counters) = service(false);
        svc.ensure_initialized("pk").unwrap();
        svc.start("assistant").await.unwrap();
        svc.handle(CallEvent::CallStarted).unwrap();

        svc.dispose().await;
        assert!(!svc.is_initialized());
        assert_eq!(svc.session().state(), CallState::Idle);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);

        svc.ensure_initialized("pk").unwrap();
        assert_eq!(counters.created.load(Ordering::SeqCst), 2);
    }
}
