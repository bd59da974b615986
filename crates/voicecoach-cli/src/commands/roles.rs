//! The `voicecoach roles` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use voicecoach_client::{create_store, load_config_from};
use voicecoach_core::traits::EvaluationStore;
use voicecoach_report::style::RoleAccent;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config)?;

    let roles = store
        .roles()
        .await
        .with_context(|| format!("failed to load roles from {}", store.base_url()))?;

    if roles.is_empty() {
        println!("No roles available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "Id", "Title", "Description"]);
    for role in &roles {
        table.add_row(vec![
            Cell::new(RoleAccent::for_role(&role.id).glyph()),
            Cell::new(&role.id),
            Cell::new(&role.title),
            Cell::new(&role.description),
        ]);
    }
    println!("{table}");
    println!("{} roles", roles.len());

    Ok(())
}
