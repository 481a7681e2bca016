//! Stats backend endpoints: snapshot ingest and the viewer query.
//!
//! `POST /rooms/{room_id}/stats` is the sink's target; it appends the
//! snapshot to the store. `GET /meetings/{meeting_name}/stats` returns, per
//! room, the latest participant rows plus the room summary.

use axum::{
    extract::Path,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::sink::RoomSnapshot;
use crate::store::{self, StatsRepository};

pub fn router() -> Router {
    Router::new()
        .route("/rooms/:room_id/stats", post(ingest_snapshot))
        .route("/meetings/:meeting_name/stats", get(meeting_stats))
}

async fn ingest_snapshot(
    Path(room_id): Path<String>,
    Json(snapshot): Json<RoomSnapshot>,
) -> ApiResult<Json<Value>> {
    if snapshot.room_id != room_id {
        return Err(ApiError::bad_request(format!(
            "Snapshot room id '{}' does not match path '{}'",
            snapshot.room_id, room_id
        )));
    }

    let mut conn = store::init_db()?;
    StatsRepository::insert_snapshot(&mut conn, &snapshot)?;

    info!(
        "Stored snapshot for room '{}' in meeting '{}' ({} participants)",
        snapshot.room_name,
        snapshot.meeting_name,
        snapshot.participants.len()
    );

    Ok(Json(json!({ "success": true })))
}

async fn meeting_stats(Path(meeting_name): Path<String>) -> ApiResult<Json<Value>> {
    let conn = store::init_db()?;

    let participants = StatsRepository::latest_participants_by_meeting(&conn, &meeting_name)?;
    let overall = StatsRepository::latest_overall_by_meeting(&conn, &meeting_name)?;

    if participants.is_empty() && overall.is_empty() {
        return Err(ApiError::not_found(format!(
            "No stats recorded for meeting '{}'",
            meeting_name
        )));
    }

    // Group the flat participant rows by room; BTreeMap keeps rooms in a
    // stable order for the viewer.
    let mut rooms: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut last_updated: BTreeMap<String, i64> = BTreeMap::new();
    for row in &participants {
        rooms.entry(row.room_name.clone()).or_default().push(json!({
            "participantId": row.participant_id,
            "displayName": row.display_name,
            "speakingCount": row.speaking_count,
            "totalSpeakingMs": row.total_speaking_ms,
            "averageSpeakingTimeMs": store::fill_average(row),
            "speakingShare": row.speaking_share,
            "balanceScore": row.balance_score,
        }));
        let entry = last_updated.entry(row.room_name.clone()).or_insert(0);
        *entry = (*entry).max(row.recorded_at);
    }

    let mut overall_by_room: BTreeMap<String, Value> = BTreeMap::new();
    for row in &overall {
        overall_by_room.insert(
            row.room_name.clone(),
            json!({
                "totalParticipants": row.total_participants,
                "totalSpeakingTimeMs": row.total_speaking_time_ms,
                "averageBalanceScore": row.average_balance_score,
            }),
        );
        let entry = last_updated.entry(row.room_name.clone()).or_insert(0);
        *entry = (*entry).max(row.recorded_at);
    }

    let room_names: std::collections::BTreeSet<String> = rooms
        .keys()
        .chain(overall_by_room.keys())
        .cloned()
        .collect();

    let rooms_json: Vec<Value> = room_names
        .into_iter()
        .map(|room_name| {
            json!({
                "roomName": room_name,
                "participants": rooms.remove(&room_name).unwrap_or_default(),
                "overallStats": overall_by_room.remove(&room_name).unwrap_or(Value::Null),
                "lastUpdated": last_updated.get(&room_name).copied().unwrap_or(0),
            })
        })
        .collect();

    Ok(Json(json!({
        "meetingName": meeting_name,
        "rooms": rooms_json,
    })))
}
