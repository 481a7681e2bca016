//! Session control endpoints.
//!
//! Start/stop requests are forwarded over the command channel to the
//! single-consumer session loop; handlers never touch the ledger directly.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::SessionApiState;
use crate::session::{SessionCommand, SessionPhase, SessionStartOptions, SessionState};

/// Request body for starting a session. Missing names fall back to the
/// configured defaults.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub meeting_name: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub meeting_id: Option<String>,
}

pub fn router(state: SessionApiState) -> Router {
    Router::new()
        .route("/session/start", post(start_session))
        .route("/session/stop", post(stop_session))
        .route("/session/status", get(session_status))
        .with_state(state)
}

async fn start_session(
    State(state): State<SessionApiState>,
    body: Option<Json<StartRequest>>,
) -> ApiResult<Json<Value>> {
    if state.status.get().await.phase == SessionPhase::Tracking {
        return Err(ApiError::conflict("A session is already being tracked"));
    }

    let request = body.map(|Json(r)| r).unwrap_or_default();

    let options = SessionStartOptions {
        meeting_name: request
            .meeting_name
            .unwrap_or_else(|| state.defaults.meeting_name.clone()),
        room_name: request
            .room_name
            .unwrap_or_else(|| state.defaults.room_name.clone()),
        meeting_id: request.meeting_id,
    };

    info!(
        "Session start requested via API: meeting '{}', room '{}'",
        options.meeting_name, options.room_name
    );

    state
        .tx
        .send(SessionCommand::Start(options))
        .await
        .map_err(|e| {
            error!("Failed to send start command: {}", e);
            ApiError::internal("Session loop unavailable")
        })?;

    // Small delay to allow the status to be updated.
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(Json(status_json(&state.status.get().await)))
}

async fn stop_session(State(state): State<SessionApiState>) -> ApiResult<Json<Value>> {
    info!("Session stop requested via API");

    state.tx.send(SessionCommand::Stop).await.map_err(|e| {
        error!("Failed to send stop command: {}", e);
        ApiError::internal("Session loop unavailable")
    })?;

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(Json(status_json(&state.status.get().await)))
}

async fn session_status(State(state): State<SessionApiState>) -> Json<Value> {
    Json(status_json(&state.status.get().await))
}

fn status_json(state: &SessionState) -> Value {
    let identity = state.identity.as_ref().map(|i| {
        json!({
            "roomId": i.room_id,
            "meetingId": i.meeting_id,
            "meetingName": i.meeting_name,
            "roomName": i.room_name,
        })
    });

    json!({
        "phase": state.phase.as_str(),
        "identity": identity,
        "durationSeconds": state.duration_seconds(),
        "currentSpeakerId": state.current_speaker_id,
        "participantCount": state.participant_count,
        "lastPushError": state.last_push_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::{SessionIdentity, SessionStatusHandle, StatusBoard};
    use tokio::sync::mpsc;

    fn api_state() -> (SessionApiState, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(4);
        let state = SessionApiState {
            tx,
            status: SessionStatusHandle::default(),
            board: StatusBoard::default(),
            defaults: SessionConfig::default(),
        };
        (state, rx)
    }

    fn identity() -> SessionIdentity {
        SessionIdentity {
            room_id: "room-1".to_string(),
            meeting_id: "meeting-1".to_string(),
            meeting_name: "Weekly sync".to_string(),
            room_name: "Breakout 1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_forwards_command_with_configured_defaults() {
        let (state, mut rx) = api_state();

        let result = start_session(State(state), None).await;
        assert!(result.is_ok());

        match rx.recv().await.unwrap() {
            SessionCommand::Start(options) => {
                assert_eq!(options.meeting_name, "Unnamed meeting");
                assert_eq!(options.room_name, "Room 1");
                assert!(options.meeting_id.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_while_tracking_is_a_conflict() {
        let (state, mut rx) = api_state();
        state.status.start_tracking(identity()).await;

        let result = start_session(State(state), None).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
        // Nothing reaches the session loop.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_after_completion_is_allowed() {
        let (state, _rx) = api_state();
        state.status.start_tracking(identity()).await;
        state.status.complete().await;

        let result = start_session(State(state), None).await;
        assert!(result.is_ok());
    }
}
