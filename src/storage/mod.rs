//! Persistence backends for [`AnalyticsData`].
//!
//! The analytics core only works on in-memory data; these sinks load it
//! before a run and save it afterwards. Failures are reported to the caller,
//! who decides whether to fall back to another backend.

pub mod json;
pub mod sqlite;

use crate::analytics::AnalyticsData;
use crate::app_dirs::AppDirs;
use crate::config::{Config, StorageBackend};
use crate::error::{Result, StorageError};
use crate::session::SessionRecord;
use serde::Serialize;
use std::io::Write;

pub use json::JsonFileStorage;
pub use sqlite::SqliteStorage;

pub trait AnalyticsStorage {
    fn load(&self) -> Result<AnalyticsData>;
    fn save(&mut self, data: &AnalyticsData) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Open the backend selected in the config
pub fn open(config: &Config) -> Result<Box<dyn AnalyticsStorage>> {
    match config.storage {
        StorageBackend::Json => {
            let path = match &config.data_path {
                Some(path) => path.clone(),
                None => AppDirs::analytics_json_path().ok_or(StorageError::NoDataDir)?,
            };
            Ok(Box::new(JsonFileStorage::new(path)))
        }
        StorageBackend::Sqlite => {
            let path = match &config.data_path {
                Some(path) => path.clone(),
                None => AppDirs::db_path().ok_or(StorageError::NoDataDir)?,
            };
            Ok(Box::new(
                SqliteStorage::open(path)?.with_retention_limit(config.retention_limit),
            ))
        }
    }
}

pub fn export_json(data: &AnalyticsData) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn import_json(json: &str) -> Result<AnalyticsData> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    timestamp: String,
    language: &'a str,
    snippet_id: &'a str,
    snippet_title: &'a str,
    difficulty: String,
    category: &'a str,
    time_in_seconds: f64,
    accuracy: f64,
    wpm: f64,
    cpm: f64,
    total_characters: usize,
    correct_characters: usize,
    error_count: usize,
    completed: bool,
    restarts: usize,
}

impl<'a> From<&'a SessionRecord> for CsvRow<'a> {
    fn from(s: &'a SessionRecord) -> Self {
        Self {
            id: &s.id,
            timestamp: s.timestamp.to_rfc3339(),
            language: &s.language,
            snippet_id: &s.snippet_id,
            snippet_title: &s.snippet_title,
            difficulty: s.difficulty.to_string(),
            category: &s.category,
            time_in_seconds: s.metrics.time_in_seconds,
            accuracy: s.metrics.accuracy,
            wpm: s.metrics.wpm,
            cpm: s.metrics.cpm,
            total_characters: s.metrics.total_characters,
            correct_characters: s.metrics.correct_characters,
            error_count: s.metrics.error_count,
            completed: s.completed,
            restarts: s.restarts,
        }
    }
}

/// One CSV row per session, with a header line
pub fn export_csv<W: Write>(sessions: &[SessionRecord], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for session in sessions {
        csv.serialize(CsvRow::from(session))?;
    }
    csv.flush()?;
    Ok(())
}
