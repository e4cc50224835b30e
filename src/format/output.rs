use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Bug, Event};

/// Bug details with its audit trail for the show view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugDetails {
    #[serde(flatten)]
    pub bug: Bug,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

/// One bucket of a breakdown (status or priority).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub value: String,
    pub count: usize,
}

/// Updates recorded on one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    /// `YYYY-MM-DD`
    pub day: String,
    pub modifications: i64,
}

impl DayCount {
    /// Expand sparse per-day counts into one entry per day for the `days`
    /// days ending at `now`, oldest first. Missing days count zero.
    #[must_use]
    pub fn fill(sparse: &[(String, i64)], days: u32, now: DateTime<Utc>) -> Vec<Self> {
        (0..i64::from(days))
            .rev()
            .map(|offset| {
                let day = (now - Duration::days(offset))
                    .format("%Y-%m-%d")
                    .to_string();
                let modifications = sparse
                    .iter()
                    .find(|(d, _)| *d == day)
                    .map_or(0, |(_, n)| *n);
                Self { day, modifications }
            })
            .collect()
    }
}

/// Aggregate statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    /// Sum of `modification_count` over all bugs.
    pub total_modifications: u64,
    pub by_status: Vec<BreakdownEntry>,
    pub by_priority: Vec<BreakdownEntry>,
    /// Window covered by `modifications_per_day`.
    pub days: u32,
    pub modifications_per_day: Vec<DayCount>,
}
