//! The `voicecoach init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("voicecoach.toml").exists() {
        println!("voicecoach.toml already exists, skipping.");
    } else {
        std::fs::write("voicecoach.toml", SAMPLE_CONFIG)?;
        println!("Created voicecoach.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set api_url and user_email in voicecoach.toml");
    println!("  2. Run: voicecoach roles");
    println!("  3. Run: voicecoach stats");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# voicecoach configuration

api_url = "http://localhost:8000"
user_email = "${VOICECOACH_USER}"

request_timeout_secs = 10
parallelism = 4
recent_activity_limit = 5
max_retries = 1
retry_delay_ms = 250

# `voicecoach stats --save` writes reports here
output_dir = "./voicecoach-reports"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use voicecoach_client::VoicecoachConfig;

    #[test]
    fn sample_config_parses_with_defaults() {
        let config: VoicecoachConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.recent_activity_limit, 5);
        assert_eq!(config.max_retries, 1);
        assert_eq!(
            config.output_dir,
            std::path::PathBuf::from("./voicecoach-reports")
        );
    }
}
