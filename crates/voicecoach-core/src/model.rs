//! Core data model types for voicecoach.
//!
//! Roles and evaluation records as the backend hands them out. Records are
//! decoded leniently: a record with a missing score or a garbled timestamp
//! is kept (as a zero-score record) and flagged instead of failing the
//! whole response.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lowest score the backend hands out.
pub const MIN_SCORE: f64 = 0.0;
/// Highest score the backend hands out.
pub const MAX_SCORE: f64 = 10.0;

/// A professional scenario category sessions are evaluated under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier (used in URLs).
    pub id: String,
    /// Display title, e.g. "Project Manager".
    pub title: String,
    /// Short description of the scenario.
    #[serde(default)]
    pub description: String,
}

impl Role {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
        }
    }
}

/// One scored voice-session outcome for a user/role pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub id: String,
    /// Overall score, 0-10.
    pub overall_score: f64,
    /// Up to five sub-scores, each 0-10.
    pub score_breakdown: Vec<f64>,
    pub duration_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub role_id: String,
    pub role_title: String,
    pub candidate_name: String,
    pub recommendation: String,
    /// Set when a required field was missing or unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defect: Option<RecordDefect>,
}

/// Why a record was only partially readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordDefect {
    MissingScore,
    BadTimestamp,
}

impl fmt::Display for RecordDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordDefect::MissingScore => write!(f, "missing or non-numeric overall_score"),
            RecordDefect::BadTimestamp => write!(f, "missing or unparseable created_at"),
        }
    }
}

impl EvaluationRecord {
    /// Whether the record was decoded with substitutions.
    pub fn is_malformed(&self) -> bool {
        self.defect.is_some()
    }
}

/// Record exactly as it appears on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
struct WireRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_number")]
    overall_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    score_1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    score_2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    score_3: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    score_4: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    score_5: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    duration_minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    role_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    role_title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    candidate_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    recommendation: String,
}

impl From<WireRecord> for EvaluationRecord {
    fn from(wire: WireRecord) -> Self {
        let mut defect = None;

        let overall_score = match wire.overall_score {
            Some(score) => clamp_score(score),
            None => {
                defect = Some(RecordDefect::MissingScore);
                MIN_SCORE
            }
        };

        let created_at = match parse_timestamp(&wire.created_at) {
            Some(ts) => ts,
            None => {
                defect.get_or_insert(RecordDefect::BadTimestamp);
                DateTime::<Utc>::UNIX_EPOCH
            }
        };

        let score_breakdown = [
            wire.score_1,
            wire.score_2,
            wire.score_3,
            wire.score_4,
            wire.score_5,
        ]
        .into_iter()
        .flatten()
        .map(clamp_score)
        .collect();

        let duration_minutes = wire
            .duration_minutes
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round().min(u32::MAX as f64) as u32)
            .unwrap_or(0);

        Self {
            id: wire.id,
            overall_score,
            score_breakdown,
            duration_minutes,
            created_at,
            role_id: wire.role_id,
            role_title: wire.role_title,
            candidate_name: wire.candidate_name,
            recommendation: wire.recommendation,
            defect,
        }
    }
}

impl<'de> Deserialize<'de> for EvaluationRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireRecord::deserialize(deserializer).map(Into::into)
    }
}

/// Body of the evaluation list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationList {
    #[serde(default, deserialize_with = "lenient_records")]
    pub evaluations: Vec<EvaluationRecord>,
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Accept a JSON number, a numeric string, or null.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(serde_json::Value::String(s)) => {
            s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    })
}

/// Accept a string, a number (ids are sometimes integers), or null.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Decode each list entry on its own. A null list is empty; an entry that is
/// not an object becomes a zero-score record flagged `MissingScore`.
fn lenient_records<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<EvaluationRecord>, D::Error> {
    let entries = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            let wire = match entry {
                serde_json::Value::Object(_) => {
                    serde_json::from_value::<WireRecord>(entry).unwrap_or_default()
                }
                _ => WireRecord::default(),
            };
            EvaluationRecord::from(wire)
        })
        .collect())
}
