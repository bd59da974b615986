//! HTML dashboard generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use voicecoach_core::statistics::{DashboardStats, RoleStats, ScoreBand};

use crate::markdown::{format_minutes, format_trend};
use crate::style::{band_class, band_color, RoleAccent};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn score_span(score: f64) -> String {
    format!(
        "<span class=\"score {}\">{:.1}</span>",
        band_class(ScoreBand::classify(score)),
        score
    )
}

/// Generate the dashboard page for `user`.
pub fn generate_html(stats: &DashboardStats, user: &str, generated_at: DateTime<Utc>) -> String {
    let overall = &stats.overall;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>voicecoach dashboard: {}</title>\n",
        html_escape(user)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Voice coaching dashboard</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} | {} roles | {}</p>\n",
        html_escape(user),
        stats.roles.len(),
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Stat cards
    html.push_str("<section class=\"cards\">\n");
    let average = if overall.total_evaluations > 0 {
        score_span(overall.average_score)
    } else {
        "-".to_string()
    };
    let cards = [
        ("Evaluations", overall.total_evaluations.to_string()),
        ("Average score", average),
        ("Practice time", format_minutes(overall.total_time_minutes)),
        (
            "Best role",
            html_escape(overall.best_role.as_deref().unwrap_or("-")),
        ),
        ("Improvement", format!("{:+.1}", overall.improvement_rate)),
    ];
    for (label, value) in cards {
        html.push_str(&format!(
            "<div class=\"card\"><div class=\"label\">{label}</div><div class=\"value\">{value}</div></div>\n"
        ));
    }
    html.push_str("</section>\n");

    // Per-role table
    html.push_str("<section class=\"roles\">\n");
    html.push_str("<h2>Roles</h2>\n");
    if stats.roles.is_empty() {
        html.push_str("<p class=\"empty\">No roles available.</p>\n");
    } else {
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Role</th><th>Sessions</th><th>Average</th><th>Latest</th><th>Trend</th><th>Best</th><th>Worst</th><th>Consistency</th><th>Excellent / Good / Needs work</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for role in &stats.roles {
            html.push_str(&role_row(role));
        }
        html.push_str("</tbody></table>\n");

        if stats.roles.iter().any(|r| r.count > 0) {
            html.push_str(&generate_bar_chart(&stats.roles));
        }
    }
    html.push_str("</section>\n");

    // Recent activity
    html.push_str("<section class=\"recent\">\n");
    html.push_str("<h2>Recent activity</h2>\n");
    if overall.recent_activity.is_empty() {
        html.push_str("<p class=\"empty\">No sessions yet.</p>\n");
    } else {
        html.push_str("<ul>\n");
        for record in &overall.recent_activity {
            html.push_str(&format!(
                "<li><time>{}</time> {} {} <span class=\"muted\">{} min</span></li>\n",
                record.created_at.format("%Y-%m-%d %H:%M"),
                html_escape(&record.role_title),
                score_span(record.overall_score),
                record.duration_minutes
            ));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</section>\n");

    html.push_str("</body>\n</html>");
    html
}

fn role_row(role: &RoleStats) -> String {
    let accent = RoleAccent::for_role(&role.role_id);
    let name = format!(
        "<span class=\"accent\" style=\"border-color:{}\">{}</span> {}",
        accent.color(),
        accent.glyph(),
        html_escape(&role.role_title)
    );
    if role.count == 0 {
        return format!(
            "<tr class=\"idle\"><td>{name}</td><td>0</td><td colspan=\"7\">No sessions yet</td></tr>\n"
        );
    }
    let d = &role.distribution;
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1}</td><td>{:.1}</td><td>{}</td><td>{} / {} / {}</td></tr>\n",
        name,
        role.count,
        score_span(role.average_score),
        score_span(role.latest_score),
        format_trend(role),
        role.best_score,
        role.worst_score,
        role.consistency
            .map(|c| format!("{c:.0}"))
            .unwrap_or_else(|| "-".to_string()),
        d.excellent,
        d.good,
        d.needs_work,
    )
}

/// Write the HTML dashboard to a file.
pub fn write_html_report(
    stats: &DashboardStats,
    user: &str,
    generated_at: DateTime<Utc>,
    path: &Path,
) -> Result<()> {
    let html = generate_html(stats, user, generated_at);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Horizontal bars of each role's average, coloured by score band.
fn generate_bar_chart(roles: &[RoleStats]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let total_height = roles.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, role) in roles.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let fraction = (role.average_score / 10.0).clamp(0.0, 1.0);
        let width = (fraction * max_width as f64) as usize;
        let color = band_color(ScoreBand::classify(role.average_score));

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&role.role_title)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            role.average_score
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --muted: #6b7280; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --muted: #9ca3af; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta, .muted, .empty { color: var(--muted); }
.cards { display: flex; flex-wrap: wrap; gap: 1rem; }
.card { border: 1px solid var(--border); border-radius: 12px; padding: 1rem 1.5rem; min-width: 10rem; }
.card .label { color: var(--muted); font-size: 0.85rem; }
.card .value { font-size: 1.5rem; font-weight: 600; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
tr.idle td { color: var(--muted); }
.accent { display: inline-block; border-left: 4px solid; padding-left: 0.4rem; }
.score { font-weight: 600; }
.score.excellent { color: #10b981; }
.score.good { color: #f59e0b; }
.score.needs-work { color: #ef4444; }
ul { list-style: none; padding: 0; }
li { padding: 0.4rem 0; border-bottom: 1px solid var(--border); }
time { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; margin-right: 0.5rem; }
svg { margin: 1rem 0; }
"#;
