//! The `voicecoach stats` command.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use voicecoach_client::{create_store, load_config_from};
use voicecoach_core::aggregator::{RoleFailure, StatsAggregator, StatsReporter};
use voicecoach_core::model::{EvaluationRecord, Role};
use voicecoach_core::statistics::{DashboardStats, ScoreBand};
use voicecoach_core::traits::EvaluationStore;
use voicecoach_report::html::{generate_html, write_html_report};
use voicecoach_report::json::{to_json, write_json_report};
use voicecoach_report::markdown::{
    format_minutes, format_trend, generate_markdown, write_markdown_report,
};
use voicecoach_report::style::{band_marker, RoleAccent};

use super::resolve_user;

/// Console failure reporter.
#[derive(Default)]
struct ConsoleReporter {
    total_failure: AtomicBool,
}

impl StatsReporter for ConsoleReporter {
    fn on_partial_failure(&self, failures: &[RoleFailure]) {
        let names: Vec<&str> = failures.iter().map(|f| f.role_title.as_str()).collect();
        eprintln!(
            "Warning: could not load evaluations for {} role(s): {}",
            failures.len(),
            names.join(", ")
        );
        for f in failures {
            eprintln!("  {}: {}", f.role_title, f.error);
        }
    }

    fn on_total_failure(&self, failures: &[RoleFailure]) {
        self.total_failure.store(true, Ordering::Relaxed);
        if let Some(first) = failures.first() {
            eprintln!("Error: could not load evaluations for any role: {}", first.error);
        }
    }

    fn on_malformed_records(&self, role: &Role, records: &[&EvaluationRecord]) {
        eprintln!(
            "Warning: {} incomplete record(s) for {} counted with score 0",
            records.len(),
            role.title
        );
    }
}

pub async fn execute(
    user: Option<String>,
    combined: bool,
    format: String,
    output: Option<PathBuf>,
    save: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let target = output.or_else(|| save.then(|| config.output_dir.clone()));
    if format == "text" && target.is_some() {
        anyhow::bail!(
            "the text summary is printed only; use --format json, markdown or html to save a report"
        );
    }
    let user = resolve_user(user, &config)?;
    let store = Arc::new(create_store(&config)?);

    let roles = store
        .roles()
        .await
        .with_context(|| format!("failed to load roles from {}", store.base_url()))?;
    tracing::debug!(roles = roles.len(), combined, "computing dashboard");

    let aggregator = StatsAggregator::new(store, config.aggregator_config());
    let reporter = ConsoleReporter::default();
    let stats = if combined {
        aggregator
            .compute_stats_combined(&user, &roles, &reporter)
            .await
    } else {
        aggregator.compute_stats(&user, &roles, &reporter).await
    };

    let now = Utc::now();
    match (format.as_str(), target) {
        ("text", _) => print_summary(&stats),
        ("json", None) => println!("{}", to_json(&stats)?),
        ("markdown" | "md", None) => println!("{}", generate_markdown(&stats, &user, now)),
        ("html", None) => println!("{}", generate_html(&stats, &user, now)),
        (fmt @ ("json" | "markdown" | "md" | "html"), Some(dir)) => {
            let path = save_report(&stats, &user, fmt, &dir)?;
            eprintln!("Report saved to: {}", path.display());
        }
        (other, _) => anyhow::bail!(
            "unknown format '{other}' (expected text, json, markdown or html)"
        ),
    }

    if reporter.total_failure.load(Ordering::Relaxed) {
        anyhow::bail!("no evaluations could be loaded for {user}");
    }
    Ok(())
}

fn save_report(stats: &DashboardStats, user: &str, format: &str, dir: &Path) -> Result<PathBuf> {
    let now = Utc::now();
    let timestamp = now.format("%Y-%m-%dT%H%M%S");
    let path = match format {
        "json" => {
            let path = dir.join(format!("dashboard-{timestamp}.json"));
            write_json_report(stats, &path)?;
            path
        }
        "html" => {
            let path = dir.join(format!("dashboard-{timestamp}.html"));
            write_html_report(stats, user, now, &path)?;
            path
        }
        _ => {
            let path = dir.join(format!("dashboard-{timestamp}.md"));
            write_markdown_report(stats, user, now, &path)?;
            path
        }
    };
    Ok(path)
}

fn print_summary(stats: &DashboardStats) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Role",
        "Sessions",
        "Average",
        "Latest",
        "Trend",
        "Best",
        "Consistency",
        "Time",
    ]);

    for role in &stats.roles {
        let title = format!(
            "{} {}",
            RoleAccent::for_role(&role.role_id).glyph(),
            role.role_title
        );
        if role.count == 0 {
            table.add_row(vec![
                Cell::new(title),
                Cell::new(0),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }
        table.add_row(vec![
            Cell::new(title),
            Cell::new(role.count),
            Cell::new(scored(role.average_score)),
            Cell::new(scored(role.latest_score)),
            Cell::new(format_trend(role)),
            Cell::new(format!("{:.1}", role.best_score)),
            Cell::new(
                role.consistency
                    .map(|c| format!("{c:.0}"))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(format_minutes(role.total_time_minutes)),
        ]);
    }

    println!("{table}");

    let overall = &stats.overall;
    println!();
    println!("Evaluations:   {}", overall.total_evaluations);
    if overall.total_evaluations > 0 {
        println!("Average score: {}", scored(overall.average_score));
    } else {
        println!("Average score: -");
    }
    println!("Practice time: {}", format_minutes(overall.total_time_minutes));
    println!("Best role:     {}", overall.best_role.as_deref().unwrap_or("-"));
    println!("Improvement:   {:+.1}", overall.improvement_rate);

    if !overall.recent_activity.is_empty() {
        println!("\nRecent activity:");
        for record in &overall.recent_activity {
            println!(
                "  {}  {:<24} {}  {} min",
                record.created_at.format("%Y-%m-%d %H:%M"),
                record.role_title,
                scored(record.overall_score),
                record.duration_minutes
            );
        }
    }
}

fn scored(score: f64) -> String {
    format!("{} {score:.1}", band_marker(ScoreBand::classify(score)))
}
