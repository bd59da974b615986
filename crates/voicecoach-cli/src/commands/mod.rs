pub mod history;
pub mod init;
pub mod roles;
pub mod session;
pub mod stats;

use anyhow::Result;

use voicecoach_client::VoicecoachConfig;

/// Pick the user from the flag, then the config.
pub fn resolve_user(flag: Option<String>, config: &VoicecoachConfig) -> Result<String> {
    flag.filter(|u| !u.trim().is_empty())
        .or_else(|| config.user_email.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no user given; pass --user or set user_email in voicecoach.toml"
            )
        })
}
