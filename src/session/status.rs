//! Session status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of a room tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Tracking,
    Flushing,
    Completed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Tracking => "tracking",
            Self::Flushing => "flushing",
            Self::Completed => "completed",
        }
    }
}

/// Identity of the room session, carried on every pushed snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub room_id: String,
    pub meeting_id: String,
    pub meeting_name: String,
    pub room_name: String,
}

/// Current session state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub identity: Option<SessionIdentity>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub current_speaker_id: Option<String>,
    pub participant_count: usize,
    /// Most recent sink push failure; cleared by the next successful push.
    pub last_push_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            identity: None,
            started_at: None,
            current_speaker_id: None,
            participant_count: 0,
            last_push_error: None,
        }
    }
}

impl SessionState {
    /// Duration since tracking started, in seconds.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = chrono::Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle for sharing session state between the session loop
/// and API handlers.
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    pub async fn start_tracking(&self, identity: SessionIdentity) {
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::Tracking;
        state.identity = Some(identity);
        state.started_at = Some(chrono::Utc::now());
        state.current_speaker_id = None;
        state.participant_count = 0;
        state.last_push_error = None;
    }

    pub async fn set_phase(&self, phase: SessionPhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    pub async fn update_live(&self, current_speaker_id: Option<String>, participant_count: usize) {
        let mut state = self.inner.lock().await;
        state.current_speaker_id = current_speaker_id;
        state.participant_count = participant_count;
    }

    pub async fn set_push_error(&self, error: Option<String>) {
        let mut state = self.inner.lock().await;
        state.last_push_error = error;
    }

    pub async fn complete(&self) {
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::Completed;
        state.current_speaker_id = None;
    }
}
