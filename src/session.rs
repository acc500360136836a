use crate::metrics::MetricsRecord;
use chrono::{DateTime, Local};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// A code snippet supplied by the content catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub code: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
    Complete,
}

/// Live state of one typing attempt
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub target: String,
    pub input: String,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
    // Derived from the latest comparison
    pub correct_count: usize,
    pub total_count: usize,
    pub error_positions: Vec<usize>,
    // None until the input surface supplies a manual keystroke hint
    pub manual_char_count: Option<usize>,
    pub restart_count: usize,
}

impl SessionState {
    pub fn new(target: String, restart_count: usize) -> Self {
        Self {
            target,
            restart_count,
            ..Default::default()
        }
    }

    /// Denominator for accuracy and speed: manual keystrokes when known,
    /// otherwise every typed char.
    pub fn typed_volume(&self) -> usize {
        self.manual_char_count.unwrap_or(self.total_count)
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Complete
    }
}

/// Finalized attempt, appended to the analytics log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub language: String,
    pub snippet_id: String,
    pub snippet_title: String,
    pub difficulty: Difficulty,
    pub category: String,
    #[serde(flatten)]
    pub metrics: MetricsRecord,
    pub completed: bool,
    pub restarts: usize,
}

impl SessionRecord {
    pub fn new(
        snippet: &Snippet,
        timestamp: DateTime<Local>,
        metrics: MetricsRecord,
        completed: bool,
        restarts: usize,
    ) -> Self {
        Self {
            id: generate_session_id(timestamp),
            timestamp,
            language: snippet.language.clone(),
            snippet_id: snippet.id.clone(),
            snippet_title: snippet.title.clone(),
            difficulty: snippet.difficulty,
            category: snippet.category.clone(),
            metrics,
            completed,
            restarts,
        }
    }

    /// Calendar day of the session in local time
    pub fn date(&self) -> chrono::NaiveDate {
        self.timestamp.date_naive()
    }
}

/// `<unix-millis>-<9 lowercase alphanumerics>`
pub fn generate_session_id(at: DateTime<Local>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}", at.timestamp_millis(), suffix)
}
