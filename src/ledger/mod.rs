//! Speaker ledger state machine.
//!
//! Converts normalized speaker signals and monitor ticks into a consistent
//! per-participant record of speaking intervals, counts and durations.
//! The ledger is a plain owned value mutated by exactly one caller (the
//! session loop) — all methods take `now` as epoch milliseconds so the
//! transition function is deterministic and unit-testable without a clock.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::normalizer::SpeakerSignal;

/// Granularity used when banking a closed interval's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationRounding {
    /// Bank the raw elapsed milliseconds.
    #[default]
    Milliseconds,
    /// Round the elapsed time to the nearest whole second.
    Seconds,
}

/// Accumulated speaking statistics for one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub participant_id: String,
    pub display_name: String,
    /// Number of not-speaking → speaking transitions.
    pub speaking_count: u32,
    /// Total banked speaking time. Only grows when an interval closes.
    pub total_speaking_ms: i64,
    pub is_speaking: bool,
    /// Open-interval start. `Some` iff `is_speaking`.
    #[serde(default)]
    pub speaking_started_at: Option<i64>,
}

impl ParticipantRecord {
    fn new(participant_id: &str, display_name: Option<&str>) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            display_name: display_name
                .map(String::from)
                .unwrap_or_else(|| placeholder_name(participant_id)),
            speaking_count: 0,
            total_speaking_ms: 0,
            is_speaking: false,
            speaking_started_at: None,
        }
    }
}

fn placeholder_name(participant_id: &str) -> String {
    format!("Participant {}", participant_id)
}

/// Explicit per-participant state as reported by an external source
/// (e.g. a polled roster). Authoritative when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStatus {
    pub participant_id: String,
    #[serde(default)]
    pub is_muted: Option<bool>,
    #[serde(default)]
    pub is_speaking: Option<bool>,
}

/// What an authoritative status report did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Muted or explicitly not speaking — the open interval was closed.
    Closed,
    /// Explicitly speaking — the liveness clock was refreshed.
    Refreshed,
    /// The report carried no usable flags; timeout inference still applies.
    Unchanged,
}

/// The per-room ledger: one record per sighted participant plus the
/// single-active-speaker bookkeeping.
///
/// Invariants (checked by tests, relied on everywhere):
/// - at most one record has `is_speaking == true`, and its id equals
///   `current_speaker_id`;
/// - `total_speaking_ms` never changes while that record is speaking;
/// - `last_signal_at` is `Some` iff `current_speaker_id` is `Some`.
#[derive(Debug, Clone)]
pub struct Ledger {
    participants: HashMap<String, ParticipantRecord>,
    current_speaker_id: Option<String>,
    /// Time of the most recent corroborating signal for the current speaker.
    last_signal_at: Option<i64>,
    rounding: DurationRounding,
}

impl Ledger {
    pub fn new(rounding: DurationRounding) -> Self {
        Self {
            participants: HashMap::new(),
            current_speaker_id: None,
            last_signal_at: None,
            rounding,
        }
    }

    pub fn current_speaker_id(&self) -> Option<&str> {
        self.current_speaker_id.as_deref()
    }

    pub fn last_signal_at(&self) -> Option<i64> {
        self.last_signal_at
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Apply one normalized speaker-change signal.
    pub fn apply_signal(&mut self, signal: SpeakerSignal, now: i64) {
        match signal {
            SpeakerSignal::NoSpeaker => {
                self.close_current(now);
            }
            SpeakerSignal::Speaker { id, meta } => {
                let display_name = meta.and_then(|m| m.display_name);

                if self.current_speaker_id.as_deref() == Some(id.as_str()) {
                    // Same speaker repeating: a liveness signal. Duration
                    // accrues only at close, so just refresh the clock.
                    self.last_signal_at = Some(now);
                    return;
                }

                self.close_current(now);
                self.open_interval(&id, display_name.as_deref(), now);
            }
        }
    }

    /// Apply an authoritative status report for the *current* speaker.
    /// Reports for anyone else are ignored.
    pub fn apply_participant_status(
        &mut self,
        status: &ParticipantStatus,
        now: i64,
    ) -> StatusOutcome {
        if self.current_speaker_id.as_deref() != Some(status.participant_id.as_str()) {
            return StatusOutcome::Unchanged;
        }

        if status.is_muted == Some(true) || status.is_speaking == Some(false) {
            self.close_current(now);
            return StatusOutcome::Closed;
        }

        if status.is_speaking == Some(true) {
            self.last_signal_at = Some(now);
            return StatusOutcome::Refreshed;
        }

        StatusOutcome::Unchanged
    }

    /// Close the open interval if no corroborating signal arrived within
    /// `timeout_ms`. Returns whether an interval was closed.
    pub fn check_timeout(&mut self, now: i64, timeout_ms: i64) -> bool {
        match (self.current_speaker_id.as_ref(), self.last_signal_at) {
            (Some(_), Some(last)) if now - last > timeout_ms => {
                self.close_current(now);
                true
            }
            _ => false,
        }
    }

    /// Session-end flush: treat as an implicit no-speaker signal.
    pub fn flush(&mut self, now: i64) {
        self.close_current(now);
    }

    /// Immutable copy of all records, longest total speaking time first.
    pub fn snapshot(&self) -> Vec<ParticipantRecord> {
        let mut records: Vec<ParticipantRecord> = self.participants.values().cloned().collect();
        records.sort_by(|a, b| {
            b.total_speaking_ms
                .cmp(&a.total_speaking_ms)
                .then_with(|| a.participant_id.cmp(&b.participant_id))
        });
        records
    }

    pub fn get(&self, participant_id: &str) -> Option<&ParticipantRecord> {
        self.participants.get(participant_id)
    }

    fn close_current(&mut self, now: i64) {
        if let Some(id) = self.current_speaker_id.take() {
            let rounding = self.rounding;
            if let Some(record) = self.participants.get_mut(&id) {
                if record.is_speaking {
                    if let Some(started) = record.speaking_started_at {
                        let elapsed = (now - started).max(0);
                        record.total_speaking_ms += bank_with(rounding, elapsed);
                    }
                    record.is_speaking = false;
                    record.speaking_started_at = None;
                }
            }
        }
        self.last_signal_at = None;
    }

    fn open_interval(&mut self, id: &str, display_name: Option<&str>, now: i64) {
        let record = self
            .participants
            .entry(id.to_string())
            .or_insert_with(|| ParticipantRecord::new(id, display_name));

        // Upgrade a synthesized placeholder once real metadata shows up.
        if let Some(name) = display_name {
            if record.display_name == placeholder_name(id) {
                record.display_name = name.to_string();
            }
        }

        record.is_speaking = true;
        record.speaking_count += 1;
        record.speaking_started_at = Some(now);

        self.current_speaker_id = Some(id.to_string());
        self.last_signal_at = Some(now);
    }

}

fn bank_with(rounding: DurationRounding, elapsed_ms: i64) -> i64 {
    match rounding {
        DurationRounding::Milliseconds => elapsed_ms,
        DurationRounding::Seconds => ((elapsed_ms + 500) / 1000) * 1000,
    }
}
