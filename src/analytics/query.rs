use super::{averages, AnalyticsStore};
use crate::session::SessionRecord;
use chrono::{DateTime, Days, Local, Months, NaiveDate};
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Dashboard window, counted back from "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum Timeframe {
    #[strum(to_string = "1d")]
    Day,
    #[strum(to_string = "7d")]
    Week,
    #[strum(to_string = "30d")]
    Month,
    #[strum(to_string = "6m")]
    HalfYear,
    #[default]
    #[strum(to_string = "all")]
    All,
}

impl Timeframe {
    /// Earliest instant inside the window, `None` for all time
    pub fn cutoff(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            Self::Day => now.checked_sub_days(Days::new(1)),
            Self::Week => now.checked_sub_days(Days::new(7)),
            Self::Month => now.checked_sub_days(Days::new(30)),
            Self::HalfYear => now.checked_sub_months(Months::new(6)),
            Self::All => None,
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Self::Day),
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "6m" => Ok(Self::HalfYear),
            "all" => Ok(Self::All),
            other => Err(format!("unknown timeframe '{other}' (expected 1d, 7d, 30d, 6m or all)")),
        }
    }
}

/// Aggregates over the sessions of one timeframe
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub total_time_seconds: f64,
    pub average_cpm: f64,
    pub average_accuracy: f64,
    pub best_cpm: f64,
    pub best_accuracy: f64,
}

impl<'a> FromIterator<&'a SessionRecord> for SummaryStats {
    fn from_iter<I: IntoIterator<Item = &'a SessionRecord>>(iter: I) -> Self {
        let sessions: Vec<&SessionRecord> = iter.into_iter().collect();
        let (average_cpm, average_accuracy) = averages(sessions.iter().copied());
        Self {
            total_sessions: sessions.len(),
            completed_sessions: sessions.iter().filter(|s| s.completed).count(),
            total_time_seconds: sessions.iter().map(|s| s.metrics.time_in_seconds).sum(),
            average_cpm,
            average_accuracy,
            best_cpm: sessions.iter().map(|s| s.metrics.cpm).fold(0.0, f64::max),
            best_accuracy: sessions
                .iter()
                .map(|s| s.metrics.accuracy)
                .fold(0.0, f64::max),
        }
    }
}

/// One cell of the activity heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub count: usize,
    /// Intensity 0-4
    pub level: u8,
}

pub fn activity_level(count: usize) -> u8 {
    match count {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=9 => 3,
        _ => 4,
    }
}

impl AnalyticsStore {
    /// The `n` newest sessions, newest first
    pub fn recent(&self, n: usize) -> Vec<&SessionRecord> {
        self.sessions()
            .iter()
            .sorted_by(|a, b| b.timestamp.cmp(&a.timestamp))
            .take(n)
            .collect()
    }

    /// Sessions with `start <= timestamp <= end`, in log order
    pub fn in_range(&self, start: DateTime<Local>, end: DateTime<Local>) -> Vec<&SessionRecord> {
        self.sessions()
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .collect()
    }

    pub fn in_timeframe(&self, timeframe: Timeframe, now: DateTime<Local>) -> Vec<&SessionRecord> {
        match timeframe.cutoff(now) {
            Some(cutoff) => self
                .sessions()
                .iter()
                .filter(|s| s.timestamp >= cutoff)
                .collect(),
            None => self.sessions().iter().collect(),
        }
    }

    pub fn summary(&self, timeframe: Timeframe, now: DateTime<Local>) -> SummaryStats {
        self.in_timeframe(timeframe, now).into_iter().collect()
    }

    /// Session counts for the `days` calendar days ending at `today`, oldest first
    pub fn activity(&self, days: u32, today: NaiveDate) -> Vec<ActivityDay> {
        let counts: HashMap<NaiveDate, usize> = self.sessions().iter().map(|s| s.date()).counts();

        (0..days)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back as u64)))
            .map(|date| {
                let count = counts.get(&date).copied().unwrap_or(0);
                ActivityDay {
                    date,
                    count,
                    level: activity_level(count),
                }
            })
            .collect()
    }
}
