//! The `voicecoach history` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use voicecoach_client::{create_store, load_config_from};
use voicecoach_core::statistics::{compute_role_stats, sorted_newest_first, ScoreBand};
use voicecoach_core::traits::EvaluationStore;
use voicecoach_report::json::to_json;
use voicecoach_report::markdown::{format_minutes, format_trend, generate_history_markdown};

use super::resolve_user;

pub async fn execute(
    role_id: String,
    user: Option<String>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user = resolve_user(user, &config)?;
    let store = create_store(&config)?;

    let roles = store
        .roles()
        .await
        .with_context(|| format!("failed to load roles from {}", store.base_url()))?;
    let role = roles
        .into_iter()
        .find(|r| r.id == role_id)
        .ok_or_else(|| {
            anyhow::anyhow!("unknown role '{role_id}'; run `voicecoach roles` to list roles")
        })?;

    let records = store
        .role_evaluations(&user, &role.id)
        .await
        .with_context(|| format!("failed to load {} history for {user}", role.title))?;
    let malformed = records.iter().filter(|r| r.is_malformed()).count();
    if malformed > 0 {
        eprintln!("Warning: {malformed} incomplete record(s) counted with score 0");
    }

    match format.as_str() {
        "markdown" | "md" => println!("{}", generate_history_markdown(&role.title, &records)),
        "json" => println!("{}", to_json(&sorted_newest_first(&records))?),
        "text" => {
            if records.is_empty() {
                println!("No sessions yet for {}.", role.title);
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec!["Date", "Candidate", "Score", "Band", "Minutes"]);
            for record in sorted_newest_first(&records) {
                table.add_row(vec![
                    Cell::new(record.created_at.format("%Y-%m-%d %H:%M")),
                    Cell::new(&record.candidate_name),
                    Cell::new(format!("{:.1}", record.overall_score)),
                    Cell::new(ScoreBand::classify(record.overall_score).label()),
                    Cell::new(record.duration_minutes),
                ]);
            }
            println!("{table}");

            let stats = compute_role_stats(&role, &records);
            println!(
                "\n{}: {} sessions, average {:.1}, trend {}, {} practiced",
                role.title,
                stats.count,
                stats.average_score,
                format_trend(&stats),
                format_minutes(stats.total_time_minutes)
            );
        }
        other => anyhow::bail!("unknown format '{other}' (expected text, json or markdown)"),
    }

    Ok(())
}
