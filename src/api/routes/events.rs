//! Speaker-event ingest endpoints.
//!
//! `POST /events` accepts the raw notification payload as-is; the shape is
//! intentionally unconstrained because normalization happens downstream in
//! the session loop. `POST /participants/status` feeds the status board
//! consulted by the monitor tick.

use axum::{extract::State, response::Json, routing::post, Router};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::api::error::{ApiError, ApiResult};
use crate::api::SessionApiState;
use crate::ledger::ParticipantStatus;
use crate::session::SessionCommand;

pub fn router(state: SessionApiState) -> Router {
    Router::new()
        .route("/events", post(ingest_event))
        .route("/participants/status", post(report_status))
        .with_state(state)
}

async fn ingest_event(
    State(state): State<SessionApiState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Value>> {
    debug!("Speaker event received: {}", payload);

    state
        .tx
        .send(SessionCommand::Signal(payload))
        .await
        .map_err(|e| {
            error!("Failed to forward speaker event: {}", e);
            ApiError::internal("Session loop unavailable")
        })?;

    Ok(Json(json!({ "accepted": true })))
}

async fn report_status(
    State(state): State<SessionApiState>,
    Json(status): Json<ParticipantStatus>,
) -> ApiResult<Json<Value>> {
    if status.participant_id.is_empty() {
        return Err(ApiError::bad_request("participantId must not be empty"));
    }

    debug!(
        "Participant status report: {} muted={:?} speaking={:?}",
        status.participant_id, status.is_muted, status.is_speaking
    );

    state.board.report(status).await;

    Ok(Json(json!({ "accepted": true })))
}
