//! The `voicecoach session` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};

use voicecoach_client::{create_store, load_config_from};
use voicecoach_core::session::SessionStartRequest;
use voicecoach_core::traits::SessionBackend;

pub async fn start(
    role: String,
    candidate: String,
    user: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user = user
        .filter(|u| !u.trim().is_empty())
        .or_else(|| config.user_email.clone());
    let request = SessionStartRequest::new(&role, &candidate, user.as_deref())?;

    let store = create_store(&config)?;
    tracing::info!(role = %request.role, "starting practice session");
    let response = store
        .start_session(&request)
        .await
        .with_context(|| format!("failed to start a {} session", request.role))?;

    println!("Session:   {}", response.session_id);
    println!("Assistant: {}", response.assistant_id);
    if !response.scenario.is_empty() {
        println!("\nScenario:\n{}", response.scenario);
    }

    Ok(())
}
