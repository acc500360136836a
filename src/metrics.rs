use crate::util::round_to;
use serde::{Deserialize, Serialize};

/// Characters per word for the legacy WPM figure
pub const CHARS_PER_WORD: f64 = 5.0;

/// Performance figures for one typing attempt
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub time_in_seconds: f64,
    pub accuracy: f64,
    pub wpm: f64,
    pub cpm: f64,
    pub total_characters: usize,
    pub correct_characters: usize,
    pub error_count: usize,
}

impl MetricsRecord {
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// Derive metrics from wall-clock millisecond timestamps and comparison counts.
///
/// `correct` is clamped to `total` so accuracy stays within [0, 100], and a
/// negative duration is clamped to zero. WPM and CPM are 0 for a zero duration.
pub fn calculate_metrics(
    started_at_ms: i64,
    ended_at_ms: i64,
    total: usize,
    correct: usize,
    errors: usize,
) -> MetricsRecord {
    let elapsed_ms = ended_at_ms.saturating_sub(started_at_ms).max(0);
    let time_in_seconds = round_to(elapsed_ms as f64 / 1000.0, 2);
    let capped_correct = correct.min(total);

    let accuracy = if total > 0 {
        (capped_correct as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let minutes = time_in_seconds / 60.0;
    let (wpm, cpm) = if minutes > 0.0 {
        let cpm = capped_correct as f64 / minutes;
        ((cpm / CHARS_PER_WORD).round(), cpm.round())
    } else {
        (0.0, 0.0)
    };

    MetricsRecord {
        time_in_seconds,
        accuracy: round_to(accuracy, 2),
        wpm,
        cpm,
        total_characters: total,
        correct_characters: capped_correct,
        error_count: errors,
    }
}

/// Rating bands for characters per minute
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CpmRating {
    Excellent,
    Good,
    Average,
    #[strum(to_string = "Below Average")]
    BelowAverage,
    Beginner,
}

impl CpmRating {
    pub fn from_cpm(cpm: f64) -> Self {
        match cpm {
            c if c >= 300.0 => Self::Excellent,
            c if c >= 200.0 => Self::Good,
            c if c >= 125.0 => Self::Average,
            c if c >= 75.0 => Self::BelowAverage,
            _ => Self::Beginner,
        }
    }

    /// Same bands on the legacy words-per-minute scale
    pub fn from_wpm(wpm: f64) -> Self {
        match wpm {
            w if w >= 60.0 => Self::Excellent,
            w if w >= 40.0 => Self::Good,
            w if w >= 25.0 => Self::Average,
            w if w >= 15.0 => Self::BelowAverage,
            _ => Self::Beginner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AccuracyRating {
    Perfect,
    Excellent,
    Good,
    Fair,
    #[strum(to_string = "Needs Improvement")]
    NeedsImprovement,
}

impl AccuracyRating {
    pub fn from_accuracy(accuracy: f64) -> Self {
        match accuracy {
            a if a >= 95.0 => Self::Perfect,
            a if a >= 90.0 => Self::Excellent,
            a if a >= 80.0 => Self::Good,
            a if a >= 70.0 => Self::Fair,
            _ => Self::NeedsImprovement,
        }
    }
}

/// "12.3s" below a minute, "2m 5.0s" otherwise
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{seconds:.1}s");
    }
    let minutes = (seconds / 60.0).floor();
    let remaining = seconds - minutes * 60.0;
    format!("{minutes}m {remaining:.1}s")
}
