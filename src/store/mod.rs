//! Snapshot storage.
//!
//! Append-only SQLite tables for participant rows and per-room summaries,
//! keyed by (meeting, room, participant). Snapshots arrive at-least-once;
//! every push is appended and readers take the newest row per key, so
//! duplicate submissions are harmless. Raw SQL with rusqlite, no ORM.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::sink::RoomSnapshot;

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS participant_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_name TEXT NOT NULL,
            room_name TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            speaking_count INTEGER NOT NULL,
            total_speaking_ms INTEGER NOT NULL,
            average_speaking_time_ms INTEGER,
            speaking_share REAL,
            balance_score INTEGER,
            recorded_at INTEGER NOT NULL
        )",
        [],
    )
    .context("Failed to create participant_stats table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_participant_stats_meeting
         ON participant_stats(meeting_name, room_name, participant_id)",
        [],
    )
    .context("Failed to create index on participant_stats")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS room_overall_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_name TEXT NOT NULL,
            room_name TEXT NOT NULL,
            total_participants INTEGER NOT NULL,
            total_speaking_time_ms INTEGER NOT NULL,
            average_balance_score REAL,
            recorded_at INTEGER NOT NULL
        )",
        [],
    )
    .context("Failed to create room_overall_stats table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_room_overall_stats_meeting
         ON room_overall_stats(meeting_name, room_name)",
        [],
    )
    .context("Failed to create index on room_overall_stats")?;

    Ok(())
}

/// A stored participant row (newest per key when queried).
#[derive(Debug, Clone)]
pub struct ParticipantStatsRow {
    pub room_name: String,
    pub participant_id: String,
    pub display_name: String,
    pub speaking_count: i64,
    pub total_speaking_ms: i64,
    pub average_speaking_time_ms: Option<i64>,
    pub speaking_share: Option<f64>,
    pub balance_score: Option<i64>,
    pub recorded_at: i64,
}

/// A stored per-room summary row.
#[derive(Debug, Clone)]
pub struct RoomOverallRow {
    pub room_name: String,
    pub total_participants: i64,
    pub total_speaking_time_ms: i64,
    pub average_balance_score: Option<f64>,
    pub recorded_at: i64,
}

/// Repository for snapshot rows.
pub struct StatsRepository;

impl StatsRepository {
    /// Append one snapshot: every participant row plus the room summary,
    /// in a single transaction.
    pub fn insert_snapshot(conn: &mut Connection, snapshot: &RoomSnapshot) -> Result<()> {
        let tx = conn.transaction().context("Failed to begin transaction")?;

        for row in &snapshot.participants {
            tx.execute(
                "INSERT INTO participant_stats (
                    meeting_name, room_name, participant_id, display_name,
                    speaking_count, total_speaking_ms, average_speaking_time_ms,
                    speaking_share, balance_score, recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    snapshot.meeting_name,
                    snapshot.room_name,
                    row.participant_id,
                    row.display_name,
                    row.speaking_count,
                    row.total_speaking_ms,
                    row.average_speaking_time_ms,
                    row.speaking_share,
                    row.balance_score,
                    snapshot.recorded_at,
                ],
            )
            .context("Failed to insert participant stats row")?;
        }

        let total_speaking_time_ms: i64 =
            snapshot.participants.iter().map(|p| p.total_speaking_ms).sum();
        let average_balance_score = if snapshot.participants.is_empty() {
            None
        } else {
            let sum: u32 = snapshot.participants.iter().map(|p| p.balance_score as u32).sum();
            Some(sum as f64 / snapshot.participants.len() as f64)
        };

        tx.execute(
            "INSERT INTO room_overall_stats (
                meeting_name, room_name, total_participants,
                total_speaking_time_ms, average_balance_score, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                snapshot.meeting_name,
                snapshot.room_name,
                snapshot.participants.len() as i64,
                total_speaking_time_ms,
                average_balance_score,
                snapshot.recorded_at,
            ],
        )
        .context("Failed to insert room overall stats row")?;

        tx.commit().context("Failed to commit snapshot")?;
        Ok(())
    }

    /// Newest row per (room, participant) for a meeting name.
    pub fn latest_participants_by_meeting(
        conn: &Connection,
        meeting_name: &str,
    ) -> Result<Vec<ParticipantStatsRow>> {
        let mut stmt = conn
            .prepare(
                "SELECT p.room_name, p.participant_id, p.display_name, p.speaking_count,
                        p.total_speaking_ms, p.average_speaking_time_ms, p.speaking_share,
                        p.balance_score, p.recorded_at
                 FROM participant_stats p
                 JOIN (
                     SELECT MAX(id) AS id
                     FROM participant_stats
                     WHERE meeting_name = ?1
                     GROUP BY room_name, participant_id
                 ) latest ON p.id = latest.id
                 ORDER BY p.room_name ASC, p.total_speaking_ms DESC",
            )
            .context("Failed to prepare participant stats query")?;

        let rows = stmt
            .query_map(params![meeting_name], |row| {
                Ok(ParticipantStatsRow {
                    room_name: row.get(0)?,
                    participant_id: row.get(1)?,
                    display_name: row.get(2)?,
                    speaking_count: row.get(3)?,
                    total_speaking_ms: row.get(4)?,
                    average_speaking_time_ms: row.get(5)?,
                    speaking_share: row.get(6)?,
                    balance_score: row.get(7)?,
                    recorded_at: row.get(8)?,
                })
            })
            .context("Failed to query participant stats")?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }

    /// Newest summary row per room for a meeting name.
    pub fn latest_overall_by_meeting(
        conn: &Connection,
        meeting_name: &str,
    ) -> Result<Vec<RoomOverallRow>> {
        let mut stmt = conn
            .prepare(
                "SELECT o.room_name, o.total_participants, o.total_speaking_time_ms,
                        o.average_balance_score, o.recorded_at
                 FROM room_overall_stats o
                 JOIN (
                     SELECT MAX(id) AS id
                     FROM room_overall_stats
                     WHERE meeting_name = ?1
                     GROUP BY room_name
                 ) latest ON o.id = latest.id
                 ORDER BY o.room_name ASC",
            )
            .context("Failed to prepare room overall stats query")?;

        let rows = stmt
            .query_map(params![meeting_name], |row| {
                Ok(RoomOverallRow {
                    room_name: row.get(0)?,
                    total_participants: row.get(1)?,
                    total_speaking_time_ms: row.get(2)?,
                    average_balance_score: row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })
            .context("Failed to query room overall stats")?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }
}

/// Compute the derived columns for stored rows missing them (older pushes).
/// Kept here so readers never see nulls where a value is computable.
pub fn fill_average(row: &ParticipantStatsRow) -> i64 {
    row.average_speaking_time_ms.unwrap_or_else(|| {
        if row.speaking_count == 0 {
            0
        } else {
            let avg = row.total_speaking_ms as f64 / row.speaking_count as f64;
            avg.round() as i64
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ParticipantRow;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn row(id: &str, name: &str, count: u32, total_ms: i64, score: u8) -> ParticipantRow {
        ParticipantRow {
            participant_id: id.to_string(),
            display_name: name.to_string(),
            speaking_count: count,
            total_speaking_ms: total_ms,
            is_speaking: false,
            average_speaking_time_ms: if count == 0 { 0 } else { total_ms / count as i64 },
            speaking_share: 0.0,
            balance_score: score,
        }
    }

    fn snapshot(
        meeting: &str,
        room: &str,
        recorded_at: i64,
        participants: Vec<ParticipantRow>,
    ) -> RoomSnapshot {
        RoomSnapshot {
            room_id: format!("{}-id", room),
            meeting_id: format!("{}-id", meeting),
            meeting_name: meeting.to_string(),
            room_name: room.to_string(),
            participants,
            recorded_at,
        }
    }

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('participant_stats', 'room_overall_stats')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_insert_and_query_snapshot() {
        let mut conn = setup_db();
        let snap = snapshot(
            "Weekly",
            "Room A",
            1000,
            vec![row("p1", "Alice", 2, 4000, 90), row("p2", "Bob", 1, 2000, 70)],
        );
        StatsRepository::insert_snapshot(&mut conn, &snap).unwrap();

        let rows = StatsRepository::latest_participants_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(rows.len(), 2);
        // Within a room, longest speaking time first.
        assert_eq!(rows[0].participant_id, "p1");
        assert_eq!(rows[0].total_speaking_ms, 4000);
        assert_eq!(rows[1].display_name, "Bob");

        let overall = StatsRepository::latest_overall_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(overall.len(), 1);
        assert_eq!(overall[0].total_participants, 2);
        assert_eq!(overall[0].total_speaking_time_ms, 6000);
        assert_eq!(overall[0].average_balance_score, Some(80.0));
    }

    #[test]
    fn test_latest_wins_over_older_pushes() {
        let mut conn = setup_db();
        StatsRepository::insert_snapshot(
            &mut conn,
            &snapshot("Weekly", "Room A", 1000, vec![row("p1", "Alice", 1, 1000, 100)]),
        )
        .unwrap();
        StatsRepository::insert_snapshot(
            &mut conn,
            &snapshot("Weekly", "Room A", 2000, vec![row("p1", "Alice", 3, 9000, 95)]),
        )
        .unwrap();

        let rows = StatsRepository::latest_participants_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_speaking_ms, 9000);
        assert_eq!(rows[0].speaking_count, 3);
        assert_eq!(rows[0].recorded_at, 2000);
    }

    #[test]
    fn test_duplicate_snapshot_submission_is_tolerated() {
        let mut conn = setup_db();
        let snap = snapshot("Weekly", "Room A", 1000, vec![row("p1", "Alice", 1, 1000, 100)]);
        StatsRepository::insert_snapshot(&mut conn, &snap).unwrap();
        StatsRepository::insert_snapshot(&mut conn, &snap).unwrap();

        // Readers still see exactly one row per key.
        let rows = StatsRepository::latest_participants_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_rooms_are_keyed_independently() {
        let mut conn = setup_db();
        StatsRepository::insert_snapshot(
            &mut conn,
            &snapshot("Weekly", "Room A", 1000, vec![row("p1", "Alice", 1, 1000, 100)]),
        )
        .unwrap();
        StatsRepository::insert_snapshot(
            &mut conn,
            &snapshot("Weekly", "Room B", 1000, vec![row("p1", "Alice", 2, 5000, 80)]),
        )
        .unwrap();

        let rows = StatsRepository::latest_participants_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].room_name, "Room A");
        assert_eq!(rows[1].room_name, "Room B");

        let overall = StatsRepository::latest_overall_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(overall.len(), 2);
    }

    #[test]
    fn test_meetings_are_isolated() {
        let mut conn = setup_db();
        StatsRepository::insert_snapshot(
            &mut conn,
            &snapshot("Weekly", "Room A", 1000, vec![row("p1", "Alice", 1, 1000, 100)]),
        )
        .unwrap();

        let rows = StatsRepository::latest_participants_by_meeting(&conn, "Other").unwrap();
        assert!(rows.is_empty());
        let overall = StatsRepository::latest_overall_by_meeting(&conn, "Other").unwrap();
        assert!(overall.is_empty());
    }

    #[test]
    fn test_empty_snapshot_records_summary_row() {
        let mut conn = setup_db();
        StatsRepository::insert_snapshot(&mut conn, &snapshot("Weekly", "Room A", 1000, vec![]))
            .unwrap();

        let overall = StatsRepository::latest_overall_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(overall.len(), 1);
        assert_eq!(overall[0].total_participants, 0);
        assert_eq!(overall[0].average_balance_score, None);
    }

    #[test]
    fn test_on_disk_database_persists_between_connections() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("airtime.db");

        {
            let mut conn = Connection::open(&db_path).unwrap();
            migrate(&conn).unwrap();
            StatsRepository::insert_snapshot(
                &mut conn,
                &snapshot("Weekly", "Room A", 1000, vec![row("p1", "Alice", 1, 1000, 100)]),
            )
            .unwrap();
        }

        let conn = Connection::open(&db_path).unwrap();
        let rows = StatsRepository::latest_participants_by_meeting(&conn, "Weekly").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "Alice");
    }

    #[test]
    fn test_fill_average() {
        let stored = ParticipantStatsRow {
            room_name: "Room A".to_string(),
            participant_id: "p1".to_string(),
            display_name: "Alice".to_string(),
            speaking_count: 3,
            total_speaking_ms: 1000,
            average_speaking_time_ms: None,
            speaking_share: None,
            balance_score: None,
            recorded_at: 0,
        };
        assert_eq!(fill_average(&stored), 333);
    }
}
