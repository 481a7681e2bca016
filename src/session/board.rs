//! Participant status board.
//!
//! Collaborators that know explicit per-participant state (mute flags,
//! speaking flags) report it here; the session loop consults the board once
//! per monitor tick and treats a fresh report as authoritative. Reports
//! expire after a short TTL so a stale "is speaking" report cannot keep an
//! interval alive forever.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::ledger::ParticipantStatus;

/// A pollable source of explicit per-participant state. Absence of a result
/// means the session falls back to pure timeout inference.
#[async_trait]
pub trait ParticipantStatusSource: Send + Sync {
    async fn query(&self, participant_id: &str) -> Result<Option<ParticipantStatus>>;
}

#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<Mutex<HashMap<String, (ParticipantStatus, Instant)>>>,
    ttl: Duration,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl StatusBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn report(&self, status: ParticipantStatus) {
        let mut board = self.inner.lock().await;
        board.insert(status.participant_id.clone(), (status, Instant::now()));
    }

    pub async fn get(&self, participant_id: &str) -> Option<ParticipantStatus> {
        let board = self.inner.lock().await;
        board.get(participant_id).and_then(|(status, reported_at)| {
            if reported_at.elapsed() <= self.ttl {
                Some(status.clone())
            } else {
                None
            }
        })
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

#[async_trait]
impl ParticipantStatusSource for StatusBoard {
    async fn query(&self, participant_id: &str) -> Result<Option<ParticipantStatus>> {
        Ok(self.get(participant_id).await)
    }
}
