//! voicecoach-client: Backend integration.
//!
//! Implements the `EvaluationStore` and `SessionBackend` traits over the
//! coaching backend's REST API, plus configuration loading and an
//! in-memory mock for tests.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{create_store, load_config, load_config_from, VoicecoachConfig};
pub use http::HttpStore;
pub use mock::MockStore;
