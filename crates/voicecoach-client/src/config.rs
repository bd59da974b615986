//! Client configuration and factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use voicecoach_core::aggregator::AggregatorConfig;
use voicecoach_core::statistics::DEFAULT_RECENT_LIMIT;

use crate::http::{HttpStore, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Top-level voicecoach configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicecoachConfig {
    /// Base URL of the coaching backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Signed-in user whose evaluations are shown.
    #[serde(default)]
    pub user_email: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Max concurrent role retrievals.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// How many records the recent-activity list keeps.
    #[serde(default = "default_recent_limit")]
    pub recent_activity_limit: usize,
    /// Extra attempts after a transient retrieval failure.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_parallelism() -> usize {
    4
}
fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}
fn default_retries() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    250
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./voicecoach-reports")
}

impl Default for VoicecoachConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_email: None,
            request_timeout_secs: default_timeout(),
            parallelism: default_parallelism(),
            recent_activity_limit: default_recent_limit(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            output_dir: default_output_dir(),
        }
    }
}

impl VoicecoachConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            parallelism: self.parallelism.max(1),
            request_timeout: self.request_timeout(),
            recent_limit: self.recent_activity_limit,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `voicecoach.toml` in the current directory
/// 2. `~/.config/voicecoach/config.toml`
///
/// Environment variable overrides: `VOICECOACH_API_URL`, `VOICECOACH_USER`.
pub fn load_config() -> Result<VoicecoachConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VoicecoachConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("voicecoach.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<VoicecoachConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => VoicecoachConfig::default(),
    };

    if let Ok(url) = std::env::var("VOICECOACH_API_URL") {
        config.api_url = url;
    }
    if let Ok(user) = std::env::var("VOICECOACH_USER") {
        config.user_email = Some(user);
    }

    config.api_url = resolve_env_vars(&config.api_url);
    config.user_email = config
        .user_email
        .as_deref()
        .map(resolve_env_vars)
        .filter(|u| !u.trim().is_empty());

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("voicecoach"))
}

/// Create an HTTP store for the configured backend.
pub fn create_store(config: &VoicecoachConfig) -> Result<HttpStore> {
    HttpStore::new(&config.api_url, config.request_timeout())
        .with_context(|| format!("failed to create client for {}", config.api_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_VOICECOACH_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_VOICECOACH_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_VOICECOACH_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_VOICECOACH_TEST_VAR");
    }

    #[test]
    fn unterminated_reference_is_left_alone() {
        assert_eq!(resolve_env_vars("http://${HOST"), "http://${HOST");
    }

    #[test]
    fn default_config() {
        let config = VoicecoachConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.recent_activity_limit, 5);
        assert_eq!(config.user_email, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
api_url = "https://coach.example.com"
user_email = "sam@example.com"
parallelism = 2
"#;
        let config: VoicecoachConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_url, "https://coach.example.com");
        assert_eq!(config.user_email.as_deref(), Some("sam@example.com"));
        assert_eq!(config.request_timeout_secs, 10);

        let agg = config.aggregator_config();
        assert_eq!(agg.parallelism, 2);
        assert_eq!(agg.request_timeout, Duration::from_secs(10));
        assert_eq!(agg.max_retries, 1);
        assert_eq!(agg.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/voicecoach.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicecoach.toml");
        std::fs::write(&path, "recent_activity_limit = 3\nuser_email = \"\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.recent_activity_limit, 3);
        if std::env::var("VOICECOACH_USER").is_err() {
            assert_eq!(config.user_email, None);
        }
    }
}
