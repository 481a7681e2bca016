//! Aggregation sink: periodic snapshot pushes to the stats backend.
//!
//! Snapshots are immutable copies of the ledger taken at push time, with the
//! derived columns already computed so the storage side stays a dumb append
//! log. Delivery is at-least-once; deduplication is the storage side's
//! problem, not ours.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ledger::ParticipantRecord;
use crate::session::SessionIdentity;
use crate::stats;

/// One participant's row inside a snapshot, ledger fields plus the derived
/// statistics the viewer aggregates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRow {
    pub participant_id: String,
    pub display_name: String,
    pub speaking_count: u32,
    pub total_speaking_ms: i64,
    pub is_speaking: bool,
    pub average_speaking_time_ms: i64,
    pub speaking_share: f64,
    pub balance_score: u8,
}

/// A full room snapshot, keyed by (meeting, room, participant) on the
/// storage side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: String,
    pub meeting_id: String,
    pub meeting_name: String,
    pub room_name: String,
    pub participants: Vec<ParticipantRow>,
    /// Epoch milliseconds at snapshot time.
    pub recorded_at: i64,
}

impl RoomSnapshot {
    /// Build a snapshot from a ledger snapshot, computing derived statistics
    /// against the full participant list.
    pub fn build(
        identity: &SessionIdentity,
        records: &[ParticipantRecord],
        recorded_at: i64,
    ) -> Self {
        let participants = records
            .iter()
            .map(|record| ParticipantRow {
                participant_id: record.participant_id.clone(),
                display_name: record.display_name.clone(),
                speaking_count: record.speaking_count,
                total_speaking_ms: record.total_speaking_ms,
                is_speaking: record.is_speaking,
                average_speaking_time_ms: stats::average_speaking_time_ms(record),
                speaking_share: stats::speaking_share(record, records),
                balance_score: stats::balance_score(record, records),
            })
            .collect();

        Self {
            room_id: identity.room_id.clone(),
            meeting_id: identity.meeting_id.clone(),
            meeting_name: identity.meeting_name.clone(),
            room_name: identity.room_name.clone(),
            participants,
            recorded_at,
        }
    }
}

/// Destination for room snapshots.
#[async_trait]
pub trait AggregationSink: Send + Sync {
    async fn push(&self, snapshot: &RoomSnapshot) -> Result<()>;
}

/// Sink that POSTs snapshots to the stats backend over HTTP.
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSink {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AggregationSink for HttpSink {
    async fn push(&self, snapshot: &RoomSnapshot) -> Result<()> {
        let url = format!("{}/rooms/{}/stats", self.base_url, snapshot.room_id);

        let response = self
            .client
            .post(&url)
            .json(snapshot)
            .send()
            .await
            .with_context(|| format!("Failed to push snapshot to {}", url))?;

        response
            .error_for_status()
            .with_context(|| format!("Stats backend rejected snapshot for room {}", snapshot.room_id))?;

        Ok(())
    }
}
