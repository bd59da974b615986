//! Markdown dashboard and history listings.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use voicecoach_core::model::EvaluationRecord;
use voicecoach_core::statistics::{sorted_newest_first, DashboardStats, RoleStats, ScoreBand};

use crate::style::{band_marker, RoleAccent};

/// Escape characters that would break a table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// `95` → `1h 35m`, `40` → `40m`.
pub fn format_minutes(minutes: u64) -> String {
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

/// Signed trend, or `-` when fewer than two records back it.
pub fn format_trend(stats: &RoleStats) -> String {
    if stats.has_trend() {
        format!("{:+.1}", stats.trend)
    } else {
        "-".to_string()
    }
}

fn score(value: f64) -> String {
    format!("{} {value:.1}", band_marker(ScoreBand::classify(value)))
}

/// Render the dashboard for `user`.
pub fn generate_markdown(
    stats: &DashboardStats,
    user: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let mut md = String::new();
    let overall = &stats.overall;

    md.push_str("# Voice coaching dashboard\n\n");
    md.push_str(&format!(
        "User: **{}** | generated {}\n\n",
        cell(user),
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- Evaluations: {}\n", overall.total_evaluations));
    if overall.total_evaluations > 0 {
        md.push_str(&format!("- Average score: {}\n", score(overall.average_score)));
    } else {
        md.push_str("- Average score: -\n");
    }
    md.push_str(&format!(
        "- Practice time: {}\n",
        format_minutes(overall.total_time_minutes)
    ));
    md.push_str(&format!(
        "- Best role: {}\n",
        overall.best_role.as_deref().unwrap_or("-")
    ));
    md.push_str(&format!("- Improvement rate: {:+.1}\n\n", overall.improvement_rate));

    md.push_str("## Roles\n\n");
    if stats.roles.is_empty() {
        md.push_str("_No roles available._\n\n");
    } else {
        md.push_str("| Role | Sessions | Average | Latest | Trend | Best | Consistency | Time |\n");
        md.push_str("|---|---:|---:|---:|---:|---:|---:|---:|\n");
        for role in &stats.roles {
            let accent = RoleAccent::for_role(&role.role_id);
            if role.count == 0 {
                md.push_str(&format!(
                    "| {} {} | 0 | - | - | - | - | - | - |\n",
                    accent.glyph(),
                    cell(&role.role_title)
                ));
                continue;
            }
            md.push_str(&format!(
                "| {} {} | {} | {} | {} | {} | {:.1} | {} | {} |\n",
                accent.glyph(),
                cell(&role.role_title),
                role.count,
                score(role.average_score),
                score(role.latest_score),
                format_trend(role),
                role.best_score,
                role
                    .consistency
                    .map(|c| format!("{c:.0}"))
                    .unwrap_or_else(|| "-".to_string()),
                format_minutes(role.total_time_minutes),
            ));
        }
        md.push('\n');

        md.push_str("### Score distribution\n\n");
        md.push_str("| Role | Excellent (8+) | Good (6-8) | Needs work (<6) |\n");
        md.push_str("|---|---:|---:|---:|\n");
        for role in &stats.roles {
            let d = &role.distribution;
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                cell(&role.role_title),
                d.excellent,
                d.good,
                d.needs_work
            ));
        }
        md.push('\n');
    }

    md.push_str("## Recent activity\n\n");
    if overall.recent_activity.is_empty() {
        md.push_str("_No sessions yet._\n");
    } else {
        for record in &overall.recent_activity {
            md.push_str(&format!(
                "- {} · {} · {} · {} min\n",
                record.created_at.format("%Y-%m-%d %H:%M"),
                cell(&record.role_title),
                score(record.overall_score),
                record.duration_minutes
            ));
        }
    }

    md
}

/// Render one role's history, newest first.
pub fn generate_history_markdown(role_title: &str, records: &[EvaluationRecord]) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {} history\n\n", cell(role_title)));

    if records.is_empty() {
        md.push_str("_No sessions yet._\n");
        return md;
    }

    md.push_str("| Date | Candidate | Score | Band | Minutes | Recommendation |\n");
    md.push_str("|---|---|---:|---|---:|---|\n");
    for record in sorted_newest_first(records) {
        let band = ScoreBand::classify(record.overall_score);
        let mut note = cell(&record.recommendation);
        if let Some(defect) = record.defect {
            note = format!("{note} (incomplete: {defect})");
        }
        md.push_str(&format!(
            "| {} | {} | {:.1} | {} | {} | {} |\n",
            record.created_at.format("%Y-%m-%d %H:%M"),
            cell(&record.candidate_name),
            record.overall_score,
            band.label(),
            record.duration_minutes,
            note.trim(),
        ));
    }
    md
}

/// Write the dashboard as Markdown.
pub fn write_markdown_report(
    stats: &DashboardStats,
    user: &str,
    generated_at: DateTime<Utc>,
    path: &Path,
) -> Result<()> {
    let md = generate_markdown(stats, user, generated_at);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, md).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use voicecoach_core::model::{RecordDefect, Role};
    use voicecoach_core::statistics::build_dashboard;

    fn record(id: &str, role: &str, score: f64, day: u32) -> EvaluationRecord {
        EvaluationRecord {
            id: id.into(),
            overall_score: score,
            score_breakdown: vec![],
            duration_minutes: 12,
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap(),
            role_id: role.into(),
            role_title: role.to_uppercase(),
            candidate_name: "Sam".into(),
            recommendation: "Keep going".into(),
            defect: None,
        }
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn dashboard_contains_roles_and_overall() {
        let roles = vec![Role::new("pm", "PM"), Role::new("tl", "TL")];
        let histories = vec![vec![record("a", "pm", 7.0, 1), record("b", "pm", 9.0, 2)], vec![]];
        let stats = build_dashboard(&roles, &histories, 5);

        let md = generate_markdown(&stats, "sam@example.com", generated_at());
        assert!(md.contains("sam@example.com"));
        assert!(md.contains("- Evaluations: 2"));
        assert!(md.contains("- Best role: PM"));
        assert!(md.contains("| 📋 PM | 2 | ● 8.0 | ● 9.0 | +2.0 |"));
        assert!(md.contains("| 👥 TL | 0 | - |"));
        assert!(md.contains("2025-01-02 09:00"));
    }

    #[test]
    fn empty_dashboard_renders_placeholders() {
        let stats = build_dashboard(&[], &[], 5);
        let md = generate_markdown(&stats, "u", generated_at());
        assert!(md.contains("_No roles available._"));
        assert!(md.contains("_No sessions yet._"));
        assert!(md.contains("- Average score: -"));
    }

    #[test]
    fn history_is_newest_first_and_flags_defects() {
        let mut broken = record("c", "pm", 0.0, 3);
        broken.defect = Some(RecordDefect::MissingScore);
        let records = vec![record("a", "pm", 5.5, 1), broken, record("b", "pm", 8.5, 2)];

        let md = generate_history_markdown("PM", &records);
        let jan3 = md.find("2025-01-03").unwrap();
        let jan2 = md.find("2025-01-02").unwrap();
        let jan1 = md.find("2025-01-01").unwrap();
        assert!(jan3 < jan2 && jan2 < jan1);
        assert!(md.contains("| 8.5 | excellent |"));
        assert!(md.contains("| 5.5 | needs work |"));
        assert!(md.contains("incomplete: missing or non-numeric overall_score"));
    }

    #[test]
    fn pipes_are_escaped() {
        let md = generate_history_markdown("A|B", &[]);
        assert!(md.starts_with("# A\\|B history"));
    }

    #[test]
    fn minutes_formatting() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(40), "40m");
        assert_eq!(format_minutes(125), "2h 05m");
    }

    #[test]
    fn writes_file() {
        let stats = build_dashboard(&[Role::new("pm", "PM")], &[vec![]], 5);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("dashboard.md");
        write_markdown_report(&stats, "u", generated_at(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("# Voice coaching dashboard"));
    }
}
