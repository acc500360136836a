use super::AnalyticsStorage;
use crate::analytics::{
    AnalyticsData, AnalyticsStore, DailyStats, OverallStats, DEFAULT_RETENTION_LIMIT,
};
use crate::error::Result;
use crate::metrics::MetricsRecord;
use crate::session::{Difficulty, SessionRecord};
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        timestamp TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        language TEXT NOT NULL,
        snippet_id TEXT NOT NULL,
        snippet_title TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        category TEXT NOT NULL,
        time_in_seconds REAL NOT NULL,
        accuracy REAL NOT NULL,
        wpm REAL NOT NULL,
        cpm REAL NOT NULL,
        total_characters INTEGER NOT NULL,
        correct_characters INTEGER NOT NULL,
        error_count INTEGER NOT NULL,
        completed BOOLEAN NOT NULL,
        restarts INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_timestamp ON sessions(timestamp_ms);
    CREATE TABLE IF NOT EXISTS aggregates (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        data TEXT NOT NULL
    );
"#;

const INSERT: &str = r#"
    INSERT OR IGNORE INTO sessions
    (id, timestamp, timestamp_ms, language, snippet_id, snippet_title, difficulty, category,
     time_in_seconds, accuracy, wpm, cpm, total_characters, correct_characters, error_count,
     completed, restarts)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
"#;

const TRIM: &str = r#"
    DELETE FROM sessions WHERE id NOT IN (
        SELECT id FROM sessions ORDER BY timestamp_ms DESC LIMIT ?1
    )
"#;

/// Aggregates saved next to the session rows, so totals that include
/// evicted sessions survive a reload
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    daily_stats: &'a BTreeMap<NaiveDate, DailyStats>,
    overall_stats: &'a OverallStats,
    last_updated: Option<DateTime<Local>>,
}

/// Session rows bounded by the retention limit, plus a one-row snapshot of
/// the aggregates. A database without a snapshot is rebuilt by replaying its
/// sessions in time order.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    retention_limit: usize,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            retention_limit: DEFAULT_RETENTION_LIMIT,
        })
    }

    pub fn with_retention_limit(mut self, limit: usize) -> Self {
        self.retention_limit = limit;
        self
    }

    pub fn session_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// All stored sessions, oldest first
    pub fn sessions(&self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, timestamp, language, snippet_id, snippet_title, difficulty, category,
                   time_in_seconds, accuracy, wpm, cpm, total_characters, correct_characters,
                   error_count, completed, restarts
            FROM sessions
            ORDER BY timestamp_ms ASC
            "#,
        )?;

        let rows = stmt.query_map([], session_from_row)?;
        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }
        Ok(sessions)
    }
}

fn insert(conn: &Connection, s: &SessionRecord) -> rusqlite::Result<usize> {
    conn.execute(
        INSERT,
        params![
            s.id,
            s.timestamp.to_rfc3339(),
            s.timestamp.timestamp_millis(),
            s.language,
            s.snippet_id,
            s.snippet_title,
            s.difficulty.to_string(),
            s.category,
            s.metrics.time_in_seconds,
            s.metrics.accuracy,
            s.metrics.wpm,
            s.metrics.cpm,
            s.metrics.total_characters as i64,
            s.metrics.correct_characters as i64,
            s.metrics.error_count as i64,
            s.completed,
            s.restarts as i64,
        ],
    )
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let timestamp_str: String = row.get(1)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(1, "timestamp".to_string(), rusqlite::types::Type::Text)
        })?
        .with_timezone(&Local);

    let difficulty: String = row.get(5)?;
    let difficulty = difficulty.parse::<Difficulty>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(5, "difficulty".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(SessionRecord {
        id: row.get(0)?,
        timestamp,
        language: row.get(2)?,
        snippet_id: row.get(3)?,
        snippet_title: row.get(4)?,
        difficulty,
        category: row.get(6)?,
        metrics: MetricsRecord {
            time_in_seconds: row.get(7)?,
            accuracy: row.get(8)?,
            wpm: row.get(9)?,
            cpm: row.get(10)?,
            total_characters: row.get::<_, i64>(11)? as usize,
            correct_characters: row.get::<_, i64>(12)? as usize,
            error_count: row.get::<_, i64>(13)? as usize,
        },
        completed: row.get(14)?,
        restarts: row.get::<_, i64>(15)? as usize,
    })
}

impl AnalyticsStorage for SqliteStorage {
    fn load(&self) -> Result<AnalyticsData> {
        let mut sessions = self.sessions()?;
        let snapshot: Option<String> = self
            .conn
            .query_row("SELECT data FROM aggregates WHERE id = 1", [], |row| row.get(0))
            .optional()?;

        let Some(snapshot) = snapshot else {
            debug!(sessions = sessions.len(), "no snapshot, replaying stored sessions");
            let mut store = AnalyticsStore::new().with_retention_limit(self.retention_limit);
            for session in sessions {
                store.record(session);
            }
            return Ok(store.into_data());
        };

        let excess = sessions.len().saturating_sub(self.retention_limit);
        sessions.drain(..excess);
        let mut data: AnalyticsData = serde_json::from_str(&snapshot)?;
        data.sessions = sessions;
        Ok(data)
    }

    /// Insert every session not stored yet, drop rows beyond the retention
    /// limit and replace the snapshot, in one transaction
    fn save(&mut self, data: &AnalyticsData) -> Result<()> {
        let snapshot = serde_json::to_string(&Snapshot {
            daily_stats: &data.daily_stats,
            overall_stats: &data.overall_stats,
            last_updated: data.last_updated,
        })?;

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for session in &data.sessions {
            inserted += insert(&tx, session)?;
        }
        let evicted = tx.execute(TRIM, params![self.retention_limit as i64])?;
        tx.execute(
            "INSERT OR REPLACE INTO aggregates (id, data) VALUES (1, ?1)",
            params![snapshot],
        )?;
        tx.commit()?;
        debug!(inserted, evicted, "sessions saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM sessions; DELETE FROM aggregates;")?;
        Ok(())
    }
}
