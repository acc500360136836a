use crate::clock::{Clock, SystemClock};
use crate::compare::{classify, compare_texts, Outcome};
use crate::metrics::{calculate_metrics, MetricsRecord};
use crate::session::{SessionRecord, SessionState, SessionStatus, Snippet};
use chrono::{DateTime, Local};
use tracing::{debug, info};

/// Drives one typing attempt at a time: Idle -> Active -> Complete.
///
/// Every transition that ends an attempt hands back the finalized
/// [`SessionRecord`]; forwarding it to analytics is up to the caller.
#[derive(Debug)]
pub struct SessionEngine<C: Clock = SystemClock> {
    clock: C,
    snippet: Option<Snippet>,
    state: SessionState,
    metrics: Option<MetricsRecord>,
}

impl SessionEngine<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for SessionEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SessionEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            snippet: None,
            state: SessionState::default(),
            metrics: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn snippet(&self) -> Option<&Snippet> {
        self.snippet.as_ref()
    }

    /// Final metrics, present once the attempt is complete
    pub fn metrics(&self) -> Option<&MetricsRecord> {
        self.metrics.as_ref()
    }

    pub fn restart_count(&self) -> usize {
        self.state.restart_count
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        classify(&self.state.input, &self.state.target)
    }

    /// Load a snippet as the new target.
    ///
    /// An attempt still in progress is abandoned first and its record is
    /// returned.
    pub fn load(&mut self, snippet: Snippet) -> Option<SessionRecord> {
        let abandoned = if self.state.status == SessionStatus::Active {
            self.reset()
        } else {
            None
        };

        debug!(snippet = %snippet.id, language = %snippet.language, "snippet loaded");
        self.state = SessionState::new(snippet.code.clone(), 0);
        self.metrics = None;
        self.snippet = Some(snippet);
        abandoned
    }

    /// Replace the live input and re-score it against the target.
    ///
    /// `manual_hint` is the number of chars the user actually typed, excluding
    /// auto-inserted indentation; when given it becomes the accuracy
    /// denominator. Ignored once the attempt is complete or before a snippet is
    /// loaded.
    pub fn update(&mut self, raw_input: &str, manual_hint: Option<usize>) -> Option<SessionRecord> {
        if self.snippet.is_none() || self.state.status == SessionStatus::Complete {
            return None;
        }

        let now = self.clock.now();
        if self.state.status == SessionStatus::Idle {
            if raw_input.is_empty() {
                return None;
            }
            self.state.status = SessionStatus::Active;
            self.state.started_at = Some(now);
            debug!("session started");
        }

        let comparison = compare_texts(raw_input, &self.state.target);
        self.state.input = raw_input.to_string();
        self.state.correct_count = comparison.correct_chars;
        self.state.total_count = comparison.total_chars;
        self.state.error_positions = comparison.error_positions;
        if manual_hint.is_some() {
            self.state.manual_char_count = manual_hint;
        }

        if !comparison.is_complete {
            return None;
        }

        self.state.ended_at = Some(now);
        self.state.status = SessionStatus::Complete;
        let metrics = self.metrics_at(now);
        self.metrics = Some(metrics);
        info!(
            cpm = metrics.cpm,
            accuracy = metrics.accuracy,
            seconds = metrics.time_in_seconds,
            "session complete"
        );

        let restarts = self.state.restart_count;
        self.snippet
            .as_ref()
            .map(|snippet| SessionRecord::new(snippet, now, metrics, true, restarts))
    }

    /// Abandon the current attempt and return to Idle on the same target.
    ///
    /// An attempt that had started is archived as an incomplete record and
    /// counts as a restart for the next attempt. Resetting after completion
    /// starts a fresh attempt with the restart counter cleared.
    pub fn reset(&mut self) -> Option<SessionRecord> {
        let target = std::mem::take(&mut self.state.target);
        let mut restarts = self.state.restart_count;
        let mut abandoned = None;

        match self.state.status {
            SessionStatus::Active if self.state.started_at.is_some() => {
                let now = self.clock.now();
                let metrics = self.metrics_at(now);
                abandoned = self.snippet.as_ref().map(|snippet| {
                    SessionRecord::new(snippet, now, metrics, false, restarts)
                });
                restarts += 1;
                debug!(restarts, typed = metrics.total_characters, "session abandoned");
            }
            SessionStatus::Complete => restarts = 0,
            _ => {}
        }

        self.state = SessionState::new(target, restarts);
        self.metrics = None;
        abandoned
    }

    /// Metrics for live display, recomputed against the clock on each call
    pub fn live_metrics(&self) -> MetricsRecord {
        match (self.state.started_at, self.state.ended_at) {
            (None, _) => MetricsRecord::zeroed(),
            (Some(_), Some(ended)) => self.metrics_at(ended),
            (Some(_), None) => self.metrics_at(self.clock.now()),
        }
    }

    fn metrics_at(&self, at: DateTime<Local>) -> MetricsRecord {
        let started_ms = self
            .state
            .started_at
            .map(|s| s.timestamp_millis())
            .unwrap_or_else(|| at.timestamp_millis());
        calculate_metrics(
            started_ms,
            at.timestamp_millis(),
            self.state.typed_volume(),
            self.manual_correct(),
            self.state.error_positions.len(),
        )
    }

    /// Correct chars the user typed themselves. Assisted chars are copied from
    /// the target, so they are taken out of the correct count as well as the
    /// denominator.
    fn manual_correct(&self) -> usize {
        match self.state.manual_char_count {
            Some(manual) => {
                let assisted = self.state.total_count.saturating_sub(manual);
                self.state.correct_count.saturating_sub(assisted)
            }
            None => self.state.correct_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::Difficulty;
    use assert_matches::assert_matches;

    fn snippet(code: &str) -> Snippet {
        Snippet {
            id: "loop".to_string(),
            title: "Counting loop".to_string(),
            code: code.to_string(),
            difficulty: Difficulty::Easy,
            category: "arrays".to_string(),
            language: "java".to_string(),
        }
    }

    fn engine(code: &str) -> (SessionEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let mut engine = SessionEngine::with_clock(clock.clone());
        assert!(engine.load(snippet(code)).is_none());
        (engine, clock)
    }

    #[test]
    fn test_update_before_load_is_noop() {
        let mut engine = SessionEngine::with_clock(ManualClock::new(0));
        assert!(engine.update("abc", None).is_none());
        assert_eq!(engine.status(), SessionStatus::Idle);
        assert_eq!(engine.live_metrics(), MetricsRecord::zeroed());
    }

    #[test]
    fn test_first_keystroke_starts_session() {
        let (mut engine, clock) = engine("abc");
        assert!(engine.update("", None).is_none());
        assert_eq!(engine.status(), SessionStatus::Idle);

        engine.update("a", None);
        assert_eq!(engine.status(), SessionStatus::Active);
        assert_eq!(
            engine.state().started_at.map(|t| t.timestamp_millis()),
            Some(clock.now_ms())
        );
    }

    #[test]
    fn test_started_at_is_kept_on_later_updates() {
        let (mut engine, clock) = engine("abcd");
        engine.update("a", None);
        let started = engine.state().started_at;
        clock.advance_ms(500);
        engine.update("ab", None);
        engine.update("", None);
        assert_eq!(engine.state().started_at, started);
        assert_eq!(engine.status(), SessionStatus::Active);
    }

    #[test]
    fn test_errors_are_recomputed_after_backspace() {
        let (mut engine, _clock) = engine("abc");
        engine.update("ax", None);
        assert_eq!(engine.state().error_positions, vec![1]);
        engine.update("a", None);
        assert!(engine.state().error_positions.is_empty());
        engine.update("ab", None);
        assert_eq!(engine.state().correct_count, 2);
        assert_eq!(engine.state().total_count, 2);
    }

    #[test]
    fn test_completion_emits_record() {
        let code = "for(int i=0;i<5;i++)";
        let (mut engine, clock) = engine(code);
        engine.update("f", None);
        clock.advance_ms(6300);

        let record = engine.update(code, None).expect("completion record");
        assert!(record.completed);
        assert_eq!(record.restarts, 0);
        assert_eq!(record.snippet_id, "loop");
        assert_eq!(record.metrics.time_in_seconds, 6.3);
        assert_eq!(record.metrics.accuracy, 100.0);
        assert_eq!(record.metrics.cpm, 200.0);
        assert_eq!(record.metrics.wpm, 40.0);
        assert_eq!(engine.status(), SessionStatus::Complete);
        assert_eq!(engine.metrics(), Some(&record.metrics));
    }

    #[test]
    fn test_complete_session_is_frozen() {
        let (mut engine, clock) = engine("hi");
        engine.update("h", None);
        clock.advance_ms(1_000);
        assert!(engine.update("hi", None).is_some());

        assert!(engine.update("hix", None).is_none());
        assert_eq!(engine.state().input, "hi");

        let before = engine.live_metrics();
        clock.advance_ms(60_000);
        assert_eq!(engine.live_metrics(), before);
    }

    #[test]
    fn test_manual_hint_is_accuracy_denominator() {
        let code = "if x {\n    y\n}";
        let (mut engine, clock) = engine(code);
        engine.update("i", Some(1));
        clock.advance_ms(6_000);
        // 4 spaces of indentation were inserted by the input surface
        let record = engine.update(code, Some(10)).unwrap();
        assert_eq!(record.metrics.total_characters, 10);
        assert_eq!(record.metrics.correct_characters, 10);
        assert_eq!(record.metrics.accuracy, 100.0);
        assert_eq!(record.metrics.cpm, 100.0);
    }

    #[test]
    fn test_assisted_chars_do_not_hide_errors() {
        let (mut engine, clock) = engine("if x {\n    y\n}");
        engine.update("i", Some(1));
        clock.advance_ms(3_000);
        // "z" is wrong; the 4 spaces after the newline were filled in
        engine.update("if z {\n    y", Some(8));

        let live = engine.live_metrics();
        assert_eq!(live.total_characters, 8);
        assert_eq!(live.correct_characters, 7);
        assert_eq!(live.error_count, 1);
        assert_eq!(live.accuracy, 87.5);

        let record = engine.reset().unwrap();
        assert!(record.metrics.accuracy < 100.0);
        assert_eq!(record.metrics, live);
    }

    #[test]
    fn test_manual_hint_survives_updates_without_hint() {
        let (mut engine, _clock) = engine("abcdef");
        engine.update("ab", Some(2));
        engine.update("abc", None);
        assert_eq!(engine.state().manual_char_count, Some(2));
    }

    #[test]
    fn test_reset_archives_in_progress_session() {
        let (mut engine, clock) = engine("0123456789");
        engine.update("0", None);
        clock.advance_ms(3_000);
        engine.update("01234", None);

        let record = engine.reset().expect("abandoned record");
        assert!(!record.completed);
        assert_eq!(record.restarts, 0);
        assert_eq!(record.metrics.total_characters, 5);
        assert_eq!(record.metrics.correct_characters, 5);
        assert_eq!(record.metrics.time_in_seconds, 3.0);

        assert_eq!(engine.status(), SessionStatus::Idle);
        assert_eq!(engine.restart_count(), 1);
        assert_eq!(engine.state().target, "0123456789");
        assert!(engine.state().input.is_empty());
        assert!(engine.state().started_at.is_none());
    }

    #[test]
    fn test_restarts_carry_into_completed_record() {
        let (mut engine, clock) = engine("ok");
        engine.update("o", None);
        engine.reset();
        engine.update("x", None);
        engine.reset();

        engine.update("o", None);
        clock.advance_ms(1_000);
        let record = engine.update("ok", None).unwrap();
        assert_eq!(record.restarts, 2);

        assert!(engine.reset().is_none());
        assert_eq!(engine.restart_count(), 0);
    }

    #[test]
    fn test_reset_when_idle_records_nothing() {
        let (mut engine, _clock) = engine("abc");
        assert!(engine.reset().is_none());
        assert_eq!(engine.restart_count(), 0);
    }

    #[test]
    fn test_load_while_active_abandons() {
        let (mut engine, _clock) = engine("abc");
        engine.update("ab", None);
        let record = engine.load(snippet("xyz"));
        assert_matches!(record, Some(ref r) if !r.completed);
        assert_eq!(engine.status(), SessionStatus::Idle);
        assert_eq!(engine.state().target, "xyz");
        assert_eq!(engine.restart_count(), 0);
    }

    #[test]
    fn test_live_metrics_follow_clock() {
        let (mut engine, clock) = engine("abcdefghij");
        assert_eq!(engine.live_metrics(), MetricsRecord::zeroed());
        engine.update("abcde", None);
        clock.advance_ms(30_000);
        let live = engine.live_metrics();
        assert_eq!(live.time_in_seconds, 30.0);
        assert_eq!(live.cpm, 10.0);
        assert_eq!(live.accuracy, 100.0);
    }

    #[test]
    fn test_outcomes_track_input() {
        let (mut engine, _clock) = engine("abc");
        engine.update("ax", None);
        assert_eq!(
            engine.outcomes(),
            vec![Outcome::Correct, Outcome::Incorrect, Outcome::Pending]
        );
    }
}
