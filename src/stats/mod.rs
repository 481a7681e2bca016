//! Derived speaking statistics.
//!
//! Pure functions over a ledger snapshot. Nothing here mutates state or
//! touches a clock, so every formula is total and directly testable.

use serde::{Deserialize, Serialize};

use crate::ledger::ParticipantRecord;

/// Average banked time per speaking interval, rounded to whole milliseconds.
/// Zero when the participant never spoke.
pub fn average_speaking_time_ms(record: &ParticipantRecord) -> i64 {
    if record.speaking_count == 0 {
        return 0;
    }
    let avg = record.total_speaking_ms as f64 / record.speaking_count as f64;
    avg.round() as i64
}

/// Share of the room's total speaking time, as a 0–100 percentage.
/// Zero when no one has banked any time yet.
pub fn speaking_share(record: &ParticipantRecord, all: &[ParticipantRecord]) -> f64 {
    let total = total_speaking_ms(all);
    if total == 0 {
        return 0.0;
    }
    record.total_speaking_ms as f64 / total as f64 * 100.0
}

/// How close a participant's speaking time is to the per-capita average,
/// 0–100. Both over- and under-talking are penalized symmetrically.
pub fn balance_score(record: &ParticipantRecord, all: &[ParticipantRecord]) -> u8 {
    if all.is_empty() {
        return 100;
    }

    let ideal = total_speaking_ms(all) as f64 / all.len() as f64;
    if ideal == 0.0 {
        return 100;
    }

    let deviation = (record.total_speaking_ms as f64 - ideal).abs() / ideal;
    let score = (100.0 - deviation * 100.0).clamp(0.0, 100.0);
    score.round() as u8
}

/// Sum of banked speaking time across the room.
pub fn total_speaking_ms(all: &[ParticipantRecord]) -> i64 {
    all.iter().map(|r| r.total_speaking_ms).sum()
}

/// Mean balance score across the room. `None` for an empty snapshot.
pub fn average_balance_score(all: &[ParticipantRecord]) -> Option<f64> {
    if all.is_empty() {
        return None;
    }
    let sum: u32 = all.iter().map(|r| balance_score(r, all) as u32).sum();
    Some(sum as f64 / all.len() as f64)
}

/// Qualitative bucket for a balance score. The exact cutoffs are a product
/// decision, so they come from config rather than being baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceStatus {
    Good,
    Fair,
    Poor,
}

impl BalanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

/// Score cutoffs for the qualitative buckets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceThresholds {
    pub good: u8,
    pub fair: u8,
}

impl Default for BalanceThresholds {
    fn default() -> Self {
        Self { good: 80, fair: 60 }
    }
}

pub fn balance_status(score: u8, thresholds: &BalanceThresholds) -> BalanceStatus {
    if score >= thresholds.good {
        BalanceStatus::Good
    } else if score >= thresholds.fair {
        BalanceStatus::Fair
    } else {
        BalanceStatus::Poor
    }
}

/// Format milliseconds as `mm:ss` for display.
pub fn format_clock(ms: i64) -> String {
    let total_seconds = (ms / 1000).max(0);
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
