//! Per-role and overall evaluation statistics.
//!
//! Everything here is a pure fold over already-fetched records. Inputs are
//! never mutated; ordering-sensitive figures (latest score, trend, recent
//! activity) are computed from a sorted copy.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{EvaluationRecord, Role};

/// Default size of the recent-activity window.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Score lower bound of the "excellent" band.
pub const EXCELLENT_THRESHOLD: f64 = 8.0;
/// Score lower bound of the "good" band.
pub const GOOD_THRESHOLD: f64 = 6.0;

/// Coarse grading of a single score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsWork,
}

impl ScoreBand {
    pub fn classify(score: f64) -> Self {
        if score >= EXCELLENT_THRESHOLD {
            ScoreBand::Excellent
        } else if score >= GOOD_THRESHOLD {
            ScoreBand::Good
        } else {
            ScoreBand::NeedsWork
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::NeedsWork => "needs work",
        }
    }
}

/// Record counts per score band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub excellent: usize,
    pub good: usize,
    pub needs_work: usize,
}

impl ScoreDistribution {
    pub fn record(&mut self, score: f64) {
        match ScoreBand::classify(score) {
            ScoreBand::Excellent => self.excellent += 1,
            ScoreBand::Good => self.good += 1,
            ScoreBand::NeedsWork => self.needs_work += 1,
        }
    }

    pub fn get(&self, band: ScoreBand) -> usize {
        match band {
            ScoreBand::Excellent => self.excellent,
            ScoreBand::Good => self.good,
            ScoreBand::NeedsWork => self.needs_work,
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.needs_work
    }
}

/// Summary of one role's evaluation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleStats {
    pub role_id: String,
    pub role_title: String,
    /// Number of records.
    pub count: usize,
    /// Mean overall score, 0 when there are no records.
    pub average_score: f64,
    /// Score of the most recent record.
    pub latest_score: f64,
    /// Latest minus second most recent score, 0 below two records.
    pub trend: f64,
    pub total_time_minutes: u64,
    pub best_score: f64,
    pub worst_score: f64,
    pub distribution: ScoreDistribution,
    /// `100 - 10 * stddev`, floored at 0. `None` without records.
    pub consistency: Option<f64>,
}

impl RoleStats {
    /// Zero-valued stats for a role with no usable history.
    pub fn empty(role: &Role) -> Self {
        Self {
            role_id: role.id.clone(),
            role_title: role.title.clone(),
            count: 0,
            average_score: 0.0,
            latest_score: 0.0,
            trend: 0.0,
            total_time_minutes: 0,
            best_score: 0.0,
            worst_score: 0.0,
            distribution: ScoreDistribution::default(),
            consistency: None,
        }
    }

    /// Whether `trend` is backed by at least two records.
    pub fn has_trend(&self) -> bool {
        self.count >= 2
    }
}

/// Summary across every role for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStats {
    pub total_evaluations: usize,
    /// Count-weighted mean of the per-role averages.
    pub average_score: f64,
    pub total_time_minutes: u64,
    /// Title of the role with the highest average, if any role has records.
    pub best_role: Option<String>,
    /// Mean trend over roles with at least two records.
    pub improvement_rate: f64,
    /// Newest records across all roles.
    pub recent_activity: Vec<EvaluationRecord>,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Per-role stats in the order the roles were requested.
    pub roles: Vec<RoleStats>,
    pub overall: OverallStats,
}

impl DashboardStats {
    /// Look up a role's stats by title.
    pub fn role(&self, title: &str) -> Option<&RoleStats> {
        self.roles.iter().find(|r| r.role_title == title)
    }

    /// Look up a role's stats by id.
    pub fn role_by_id(&self, id: &str) -> Option<&RoleStats> {
        self.roles.iter().find(|r| r.role_id == id)
    }
}

/// Newest first; equal timestamps ordered by id ascending.
pub fn newest_first(a: &EvaluationRecord, b: &EvaluationRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Return a newest-first copy of `records`.
pub fn sorted_newest_first(records: &[EvaluationRecord]) -> Vec<EvaluationRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(newest_first);
    sorted
}

/// Fold one role's records into its stats.
pub fn compute_role_stats(role: &Role, records: &[EvaluationRecord]) -> RoleStats {
    if records.is_empty() {
        return RoleStats::empty(role);
    }

    let sorted = sorted_newest_first(records);
    let n = sorted.len() as f64;

    let scores: Vec<f64> = sorted.iter().map(|r| r.overall_score).collect();
    let average = scores.iter().sum::<f64>() / n;
    let latest = scores[0];
    let trend = if scores.len() >= 2 {
        scores[0] - scores[1]
    } else {
        0.0
    };

    let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst = scores.iter().copied().fold(f64::INFINITY, f64::min);

    let mut distribution = ScoreDistribution::default();
    for &score in &scores {
        distribution.record(score);
    }

    let total_time_minutes = sorted.iter().map(|r| r.duration_minutes as u64).sum();

    RoleStats {
        role_id: role.id.clone(),
        role_title: role.title.clone(),
        count: sorted.len(),
        average_score: average,
        latest_score: latest,
        trend,
        total_time_minutes,
        best_score: best,
        worst_score: worst,
        distribution,
        consistency: Some(consistency(&scores, average)),
    }
}

/// `100 - 10 * population stddev`, floored at 0.
fn consistency(scores: &[f64], mean: f64) -> f64 {
    let variance =
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len().max(1) as f64;
    (100.0 - 10.0 * variance.sqrt()).max(0.0)
}

/// Combine per-role stats and the underlying records into the overall view.
///
/// `role_stats` must be in request order: the first role wins ties for
/// `best_role`.
pub fn compute_overall_stats<'a, I>(
    role_stats: &[RoleStats],
    records: I,
    recent_limit: usize,
) -> OverallStats
where
    I: IntoIterator<Item = &'a EvaluationRecord>,
{
    let total_evaluations: usize = role_stats.iter().map(|r| r.count).sum();
    let weighted_sum: f64 = role_stats
        .iter()
        .map(|r| r.average_score * r.count as f64)
        .sum();
    let average_score = if total_evaluations == 0 {
        0.0
    } else {
        weighted_sum / total_evaluations as f64
    };

    let total_time_minutes = role_stats.iter().map(|r| r.total_time_minutes).sum();

    let mut best: Option<&RoleStats> = None;
    for stats in role_stats.iter().filter(|r| r.count > 0) {
        match best {
            Some(current) if stats.average_score <= current.average_score => {}
            _ => best = Some(stats),
        }
    }

    let trends: Vec<f64> = role_stats
        .iter()
        .filter(|r| r.has_trend())
        .map(|r| r.trend)
        .collect();
    let improvement_rate = if trends.is_empty() {
        0.0
    } else {
        trends.iter().sum::<f64>() / trends.len() as f64
    };

    let mut recent_activity: Vec<EvaluationRecord> = records.into_iter().cloned().collect();
    recent_activity.sort_by(newest_first);
    recent_activity.truncate(recent_limit);

    OverallStats {
        total_evaluations,
        average_score,
        total_time_minutes,
        best_role: best.map(|r| r.role_title.clone()),
        improvement_rate,
        recent_activity,
    }
}

/// Build the dashboard from each role's record list.
///
/// `histories[i]` belongs to `roles[i]`; a missing entry counts as empty.
pub fn build_dashboard(
    roles: &[Role],
    histories: &[Vec<EvaluationRecord>],
    recent_limit: usize,
) -> DashboardStats {
    let role_stats: Vec<RoleStats> = roles
        .iter()
        .enumerate()
        .map(|(i, role)| {
            let records = histories.get(i).map(Vec::as_slice).unwrap_or(&[]);
            compute_role_stats(role, records)
        })
        .collect();

    let overall = compute_overall_stats(&role_stats, histories.iter().flatten(), recent_limit);

    DashboardStats {
        roles: role_stats,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, score: f64, day: u32) -> EvaluationRecord {
        EvaluationRecord {
            id: id.into(),
            overall_score: score,
            score_breakdown: vec![],
            duration_minutes: 10,
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap(),
            role_id: "pm".into(),
            role_title: "PM".into(),
            candidate_name: "Sam".into(),
            recommendation: String::new(),
            defect: None,
        }
    }

    fn pm() -> Role {
        Role::new("pm", "PM")
    }

    #[test]
    fn empty_role_is_zero_valued() {
        let stats = compute_role_stats(&pm(), &[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average_score, 0.0);
        assert!(!stats.average_score.is_nan());
        assert_eq!(stats.trend, 0.0);
        assert_eq!(stats.distribution.total(), 0);
        assert_eq!(stats.consistency, None);
    }

    #[test]
    fn single_record_has_zero_trend() {
        let stats = compute_role_stats(&pm(), &[record("a", 5.0, 1)]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.average_score, 5.0);
        assert_eq!(stats.trend, 0.0);
        assert!(!stats.has_trend());
        assert_eq!(stats.consistency, Some(100.0));
    }

    #[test]
    fn latest_follows_timestamps_not_input_order() {
        let records = vec![
            record("jan1", 4.0, 1),
            record("jan5", 9.0, 5),
            record("jan3", 6.0, 3),
        ];
        let stats = compute_role_stats(&pm(), &records);
        assert_eq!(stats.latest_score, 9.0);
        assert_eq!(stats.trend, 3.0);
        // input untouched
        assert_eq!(records[0].id, "jan1");
    }

    #[test]
    fn timestamp_ties_break_on_id() {
        let records = vec![record("b", 3.0, 2), record("a", 7.0, 2)];
        let stats = compute_role_stats(&pm(), &records);
        assert_eq!(stats.latest_score, 7.0);
        assert_eq!(stats.trend, 4.0);
    }

    #[test]
    fn best_average_worst_ordering() {
        let records = vec![
            record("a", 3.0, 1),
            record("b", 8.5, 2),
            record("c", 6.0, 3),
        ];
        let stats = compute_role_stats(&pm(), &records);
        assert_eq!(stats.best_score, 8.5);
        assert_eq!(stats.worst_score, 3.0);
        assert!(stats.best_score >= stats.average_score);
        assert!(stats.average_score >= stats.worst_score);
        assert_eq!(stats.total_time_minutes, 30);
    }

    #[test]
    fn distribution_band_edges() {
        let records = vec![
            record("a", 8.0, 1),
            record("b", 7.99, 2),
            record("c", 6.0, 3),
            record("d", 5.99, 4),
        ];
        let stats = compute_role_stats(&pm(), &records);
        assert_eq!(stats.distribution.excellent, 1);
        assert_eq!(stats.distribution.good, 2);
        assert_eq!(stats.distribution.needs_work, 1);
    }

    #[test]
    fn consistency_floors_at_zero() {
        let records = vec![record("a", 0.0, 1), record("b", 10.0, 2)];
        let stats = compute_role_stats(&pm(), &records);
        // stddev 5 -> 100 - 50
        assert_eq!(stats.consistency, Some(50.0));

        let scores = [0.0, 10.0, 0.0, 10.0];
        assert!(consistency(&scores, 5.0) >= 0.0);
        assert_eq!(consistency(&[0.0, 30.0], 15.0), 0.0);
    }

    #[test]
    fn weighted_overall_average() {
        let roles = vec![Role::new("a", "A"), Role::new("b", "B")];
        let histories = vec![
            vec![record("a1", 7.0, 1), record("a2", 9.0, 2)],
            vec![
                record("b1", 5.0, 1),
                record("b2", 6.0, 2),
                record("b3", 7.0, 3),
            ],
        ];
        let dashboard = build_dashboard(&roles, &histories, DEFAULT_RECENT_LIMIT);
        assert!((dashboard.overall.average_score - 6.8).abs() < 1e-9);
        assert_eq!(dashboard.overall.total_evaluations, 5);
        assert_eq!(dashboard.overall.total_time_minutes, 50);
    }

    #[test]
    fn best_role_tie_goes_to_first_role() {
        let roles = vec![Role::new("a", "A"), Role::new("b", "B")];
        let histories = vec![vec![record("a1", 7.0, 1)], vec![record("b1", 7.0, 2)]];
        let dashboard = build_dashboard(&roles, &histories, DEFAULT_RECENT_LIMIT);
        assert_eq!(dashboard.overall.best_role.as_deref(), Some("A"));
    }

    #[test]
    fn best_role_none_without_records() {
        let roles = vec![Role::new("a", "A")];
        let dashboard = build_dashboard(&roles, &[], DEFAULT_RECENT_LIMIT);
        assert_eq!(dashboard.overall.best_role, None);
        assert_eq!(dashboard.overall.average_score, 0.0);
        assert_eq!(dashboard.roles.len(), 1);
    }

    #[test]
    fn improvement_rate_ignores_short_histories() {
        let roles = vec![Role::new("a", "A"), Role::new("b", "B"), Role::new("c", "C")];
        let histories = vec![
            vec![record("a1", 5.0, 1), record("a2", 8.0, 2)],
            vec![record("b1", 9.0, 1), record("b2", 8.0, 2)],
            vec![record("c1", 2.0, 1)],
        ];
        let dashboard = build_dashboard(&roles, &histories, DEFAULT_RECENT_LIMIT);
        // (3 + -1) / 2
        assert!((dashboard.overall.improvement_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn recent_activity_is_bounded_and_sorted() {
        let roles = vec![Role::new("a", "A"), Role::new("b", "B")];
        let histories = vec![
            vec![record("a1", 5.0, 1), record("a2", 8.0, 4)],
            vec![record("b1", 9.0, 2), record("b2", 8.0, 3)],
        ];
        let dashboard = build_dashboard(&roles, &histories, 3);
        let ids: Vec<&str> = dashboard
            .overall
            .recent_activity
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a2", "b2", "b1"]);
    }

    #[test]
    fn total_matches_sum_of_counts() {
        let roles = vec![Role::new("a", "A"), Role::new("b", "B"), Role::new("c", "C")];
        let histories = vec![
            vec![record("a1", 5.0, 1)],
            vec![],
            vec![record("c1", 2.0, 1), record("c2", 4.0, 2)],
        ];
        let dashboard = build_dashboard(&roles, &histories, DEFAULT_RECENT_LIMIT);
        let sum: usize = dashboard.roles.iter().map(|r| r.count).sum();
        assert_eq!(dashboard.overall.total_evaluations, sum);
        assert!(dashboard.role("B").is_some());
        assert_eq!(dashboard.role_by_id("c").map(|r| r.count), Some(2));
    }
}
