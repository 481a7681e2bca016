//! Room session orchestrator.
//!
//! Owns the speaker ledger for one breakout room and is its only mutator.
//! Commands from the API, monitor ticks and push ticks are funneled through
//! one `tokio::select!` loop, so every ledger transition runs to completion
//! before the next input is looked at. Snapshot pushes are fire-and-forget;
//! a slow or failing sink never stalls event processing.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ledger::{DurationRounding, Ledger, StatusOutcome};
use crate::normalizer;
use crate::sink::{AggregationSink, RoomSnapshot};

use super::board::ParticipantStatusSource;
use super::status::{SessionIdentity, SessionPhase, SessionStatusHandle};

/// Options for starting a tracking session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartOptions {
    pub meeting_name: String,
    pub room_name: String,
    /// Upstream meeting identifier, if known. A fresh one is minted otherwise.
    #[serde(default)]
    pub meeting_id: Option<String>,
}

/// Inputs to the single-consumer session loop.
#[derive(Debug)]
pub enum SessionCommand {
    Start(SessionStartOptions),
    /// A raw speaker-change payload; normalized inside the loop.
    Signal(serde_json::Value),
    Stop,
}

/// Timing knobs for the session loop, taken from config.
#[derive(Debug, Clone)]
pub struct SessionTiming {
    pub timeout_ms: i64,
    pub tick_interval: Duration,
    pub push_interval: Duration,
    pub rounding: DurationRounding,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            tick_interval: Duration::from_secs(1),
            push_interval: Duration::from_secs(10),
            rounding: DurationRounding::Milliseconds,
        }
    }
}

pub struct RoomSession {
    timing: SessionTiming,
    sink: Arc<dyn AggregationSink>,
    status_source: Option<Arc<dyn ParticipantStatusSource>>,
    status: SessionStatusHandle,
    ledger: Option<Ledger>,
    identity: Option<SessionIdentity>,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl RoomSession {
    pub fn new(
        timing: SessionTiming,
        sink: Arc<dyn AggregationSink>,
        status_source: Option<Arc<dyn ParticipantStatusSource>>,
        status: SessionStatusHandle,
    ) -> Self {
        Self {
            timing,
            sink,
            status_source,
            status,
            ledger: None,
            identity: None,
        }
    }

    /// Drain commands and timer ticks until the command channel closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>) {
        // First tick lands one full period out, not immediately.
        let mut monitor = interval_at(
            Instant::now() + self.timing.tick_interval,
            self.timing.tick_interval,
        );
        monitor.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut push = interval_at(
            Instant::now() + self.timing.push_interval,
            self.timing.push_interval,
        );
        push.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                _ = monitor.tick() => self.on_monitor_tick(now_ms()).await,
                _ = push.tick() => self.on_push_tick(now_ms()),
            }
        }

        // Channel closed (service shutting down): flush whatever is open.
        if self.ledger.is_some() {
            self.stop_session().await;
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start(options) => self.start_session(options).await,
            SessionCommand::Signal(payload) => self.handle_signal(payload, now_ms()).await,
            SessionCommand::Stop => self.stop_session().await,
        }
    }

    async fn start_session(&mut self, options: SessionStartOptions) {
        if self.ledger.is_some() {
            warn!("Session already tracking; ignoring start request");
            return;
        }

        let identity = SessionIdentity {
            room_id: Uuid::new_v4().to_string(),
            meeting_id: options
                .meeting_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            meeting_name: options.meeting_name,
            room_name: options.room_name,
        };

        info!(
            "Tracking started for room '{}' in meeting '{}' (room_id: {})",
            identity.room_name, identity.meeting_name, identity.room_id
        );

        self.ledger = Some(Ledger::new(self.timing.rounding));
        self.status.start_tracking(identity.clone()).await;
        self.identity = Some(identity);
    }

    async fn handle_signal(&mut self, payload: serde_json::Value, now: i64) {
        let Some(ledger) = self.ledger.as_mut() else {
            debug!("Speaker event received outside a session; dropping");
            return;
        };

        let signal = normalizer::normalize(&payload);
        debug!("Normalized speaker signal: {:?}", signal);
        ledger.apply_signal(signal, now);

        let current = ledger.current_speaker_id().map(String::from);
        let count = ledger.participant_count();
        self.status.update_live(current, count).await;
    }

    async fn on_monitor_tick(&mut self, now: i64) {
        let Some(ledger) = self.ledger.as_mut() else {
            return;
        };

        let Some(speaker_id) = ledger.current_speaker_id().map(String::from) else {
            return;
        };

        // An explicit status report is authoritative; query failure or
        // absence falls back to pure timeout inference.
        let mut timeout_applies = true;
        if let Some(source) = &self.status_source {
            match source.query(&speaker_id).await {
                Ok(Some(status)) => match ledger.apply_participant_status(&status, now) {
                    StatusOutcome::Closed => {
                        info!("Speaker {} closed by explicit status report", speaker_id);
                        timeout_applies = false;
                    }
                    StatusOutcome::Refreshed => {
                        timeout_applies = false;
                    }
                    StatusOutcome::Unchanged => {}
                },
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "Participant status query failed: {:#}. Falling back to timeout inference",
                        e
                    );
                }
            }
        }

        if timeout_applies && ledger.check_timeout(now, self.timing.timeout_ms) {
            info!(
                "Speaker {} closed by timeout ({}ms without a signal)",
                speaker_id, self.timing.timeout_ms
            );
        }

        let current = ledger.current_speaker_id().map(String::from);
        let count = ledger.participant_count();
        self.status.update_live(current, count).await;
    }

    fn on_push_tick(&mut self, now: i64) {
        let (Some(ledger), Some(identity)) = (self.ledger.as_ref(), self.identity.as_ref()) else {
            return;
        };

        let snapshot = RoomSnapshot::build(identity, &ledger.snapshot(), now);
        let sink = Arc::clone(&self.sink);
        let status = self.status.clone();

        tokio::spawn(async move {
            match sink.push(&snapshot).await {
                Ok(()) => {
                    debug!(
                        "Pushed snapshot for room {} ({} participants)",
                        snapshot.room_id,
                        snapshot.participants.len()
                    );
                    status.set_push_error(None).await;
                }
                Err(e) => {
                    // Retried only on the next scheduled interval.
                    warn!("Snapshot push failed: {:#}", e);
                    status.set_push_error(Some(e.to_string())).await;
                }
            }
        });
    }

    async fn stop_session(&mut self) {
        let (Some(mut ledger), Some(identity)) = (self.ledger.take(), self.identity.take()) else {
            warn!("No tracking session in progress; ignoring stop request");
            return;
        };

        self.status.set_phase(SessionPhase::Flushing).await;

        let now = now_ms();
        ledger.flush(now);

        let records = ledger.snapshot();
        let total_ms: i64 = records.iter().map(|r| r.total_speaking_ms).sum();
        info!(
            "Session flushed for room '{}': {} participants, {}ms total speaking time",
            identity.room_name,
            records.len(),
            total_ms
        );

        // Final push is best-effort: logged, not retried.
        let snapshot = RoomSnapshot::build(&identity, &records, now);
        if let Err(e) = self.sink.push(&snapshot).await {
            warn!("Final snapshot push failed: {:#}", e);
            self.status.set_push_error(Some(e.to_string())).await;
        }

        self.status.update_live(None, records.len()).await;
        self.status.complete().await;
    }
}
