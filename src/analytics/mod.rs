//! Historical analytics: an append-only session log with per-day, per-language
//! and per-difficulty aggregates that are refreshed on every recorded session.
//!
//! The store is storage-agnostic. Callers load an [`AnalyticsData`] from a
//! persistence backend, wrap it in an [`AnalyticsStore`], record sessions and
//! save the data back.

pub mod query;
pub mod streak;

use crate::session::{Difficulty, SessionRecord};
use crate::util::mean;
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub use query::{ActivityDay, SummaryStats, Timeframe};

/// Sessions kept in the log before the oldest are evicted
pub const DEFAULT_RETENTION_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub sessions_count: usize,
    pub total_time_seconds: f64,
    pub average_cpm: f64,
    pub average_accuracy: f64,
    pub best_cpm: f64,
    pub best_accuracy: f64,
    pub languages_used: Vec<String>,
    pub completed_sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageStats {
    pub language: String,
    pub sessions: usize,
    pub average_cpm: f64,
    pub average_accuracy: f64,
    pub best_cpm: f64,
    pub total_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultyStats {
    pub sessions: usize,
    pub average_cpm: f64,
    pub average_accuracy: f64,
    /// Percentage of sessions that were completed
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverallStats {
    pub total_sessions: usize,
    pub total_time_seconds: f64,
    pub average_cpm: f64,
    pub average_accuracy: f64,
    pub best_cpm: f64,
    pub best_accuracy: f64,
    pub favorite_language: Option<String>,
    pub total_completed_sessions: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_session_date: Option<NaiveDate>,
    /// In order of first appearance
    pub language_stats: Vec<LanguageStats>,
    pub difficulty_stats: BTreeMap<Difficulty, DifficultyStats>,
}

impl OverallStats {
    pub fn language(&self, language: &str) -> Option<&LanguageStats> {
        self.language_stats.iter().find(|l| l.language == language)
    }
}

/// Everything the persistence layer loads and saves
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsData {
    pub sessions: Vec<SessionRecord>,
    pub daily_stats: BTreeMap<NaiveDate, DailyStats>,
    pub overall_stats: OverallStats,
    pub last_updated: Option<DateTime<Local>>,
}

impl AnalyticsData {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.overall_stats.total_sessions == 0
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticsStore {
    data: AnalyticsData,
    retention_limit: usize,
}

impl Default for AnalyticsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsStore {
    pub fn new() -> Self {
        Self::from_data(AnalyticsData::default())
    }

    pub fn from_data(data: AnalyticsData) -> Self {
        Self {
            data,
            retention_limit: DEFAULT_RETENTION_LIMIT,
        }
    }

    pub fn with_retention_limit(mut self, limit: usize) -> Self {
        self.retention_limit = limit;
        self
    }

    pub fn data(&self) -> &AnalyticsData {
        &self.data
    }

    pub fn into_data(self) -> AnalyticsData {
        self.data
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.data.sessions
    }

    pub fn overall(&self) -> &OverallStats {
        &self.data.overall_stats
    }

    pub fn daily(&self, date: NaiveDate) -> Option<&DailyStats> {
        self.data.daily_stats.get(&date)
    }

    /// Append a finished session and refresh every aggregate it touches
    pub fn record(&mut self, session: SessionRecord) {
        debug!(
            id = %session.id,
            language = %session.language,
            completed = session.completed,
            "recording session"
        );

        self.data.sessions.push(session.clone());
        let len = self.data.sessions.len();
        if len > self.retention_limit {
            self.data.sessions.drain(..len - self.retention_limit);
        }

        self.update_daily(&session);
        self.update_overall(&session);
        streak::update(&mut self.data.overall_stats, &session);
        self.data.last_updated = Some(session.timestamp);
    }

    /// Drop the log and every aggregate
    pub fn clear(&mut self) {
        debug!(sessions = self.data.sessions.len(), "clearing analytics");
        self.data = AnalyticsData::default();
    }

    fn update_daily(&mut self, session: &SessionRecord) {
        let date = session.date();
        let (average_cpm, average_accuracy) =
            averages(self.data.sessions.iter().filter(|s| s.date() == date));

        let day = self
            .data
            .daily_stats
            .entry(date)
            .or_insert_with(|| DailyStats {
                date,
                ..Default::default()
            });

        day.sessions_count += 1;
        day.total_time_seconds += session.metrics.time_in_seconds;
        day.best_cpm = day.best_cpm.max(session.metrics.cpm);
        day.best_accuracy = day.best_accuracy.max(session.metrics.accuracy);
        if session.completed {
            day.completed_sessions += 1;
        }
        if !day.languages_used.contains(&session.language) {
            day.languages_used.push(session.language.clone());
        }
        day.average_cpm = average_cpm;
        day.average_accuracy = average_accuracy;
    }

    fn update_overall(&mut self, session: &SessionRecord) {
        let sessions = &self.data.sessions;
        let stats = &mut self.data.overall_stats;

        stats.total_sessions += 1;
        stats.total_time_seconds += session.metrics.time_in_seconds;
        stats.best_cpm = stats.best_cpm.max(session.metrics.cpm);
        stats.best_accuracy = stats.best_accuracy.max(session.metrics.accuracy);
        if session.completed {
            stats.total_completed_sessions += 1;
        }
        (stats.average_cpm, stats.average_accuracy) = averages(sessions.iter());

        let idx = match stats
            .language_stats
            .iter()
            .position(|l| l.language == session.language)
        {
            Some(idx) => idx,
            None => {
                stats.language_stats.push(LanguageStats {
                    language: session.language.clone(),
                    ..Default::default()
                });
                stats.language_stats.len() - 1
            }
        };
        let lang = &mut stats.language_stats[idx];
        lang.sessions += 1;
        lang.total_time_seconds += session.metrics.time_in_seconds;
        lang.best_cpm = lang.best_cpm.max(session.metrics.cpm);

        stats
            .difficulty_stats
            .entry(session.difficulty)
            .or_default()
            .sessions += 1;

        for lang in stats.language_stats.iter_mut() {
            (lang.average_cpm, lang.average_accuracy) =
                averages(sessions.iter().filter(|s| s.language == lang.language));
        }

        for (difficulty, diff) in stats.difficulty_stats.iter_mut() {
            let matching: Vec<&SessionRecord> =
                sessions.iter().filter(|s| s.difficulty == *difficulty).collect();
            (diff.average_cpm, diff.average_accuracy) = averages(matching.iter().copied());
            diff.completion_rate = if matching.is_empty() {
                0.0
            } else {
                matching.iter().filter(|s| s.completed).count() as f64 / matching.len() as f64
                    * 100.0
            };
        }

        stats.favorite_language = favorite_language(&stats.language_stats);
    }
}

/// Mean CPM and accuracy, zero for an empty set
pub(crate) fn averages<'a>(sessions: impl Iterator<Item = &'a SessionRecord>) -> (f64, f64) {
    let (cpm, accuracy): (Vec<f64>, Vec<f64>) = sessions
        .map(|s| (s.metrics.cpm, s.metrics.accuracy))
        .unzip();
    (mean(&cpm).unwrap_or(0.0), mean(&accuracy).unwrap_or(0.0))
}

/// Language with the most sessions; ties go to the one seen first
fn favorite_language(languages: &[LanguageStats]) -> Option<String> {
    let mut best: Option<&LanguageStats> = None;
    for lang in languages {
        if best.map_or(true, |b| lang.sessions > b.sessions) {
            best = Some(lang);
        }
    }
    best.map(|l| l.language.clone())
}
