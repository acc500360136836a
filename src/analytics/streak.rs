use super::OverallStats;
use crate::session::SessionRecord;

/// Fold a session into the daily practice streak.
///
/// Only completed sessions count. A session one calendar day after the last
/// completed one extends the streak, the same day leaves it alone, anything
/// else (a gap, or a date before the last one) starts over at 1.
pub fn update(stats: &mut OverallStats, session: &SessionRecord) {
    if !session.completed {
        return;
    }

    let date = session.date();
    stats.current_streak = match stats.last_session_date {
        None => 1,
        Some(last) => match (date - last).num_days() {
            1 => stats.current_streak + 1,
            0 => stats.current_streak,
            _ => 1,
        },
    };
    stats.longest_streak = stats.longest_streak.max(stats.current_streak);
    stats.last_session_date = Some(date);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tests::{at, session};
    use crate::analytics::AnalyticsStore;
    use crate::session::Difficulty;

    fn completed(day: u32) -> SessionRecord {
        session(at(day, 12), "rust", Difficulty::Easy, 200.0, 95.0, true)
    }

    #[test]
    fn test_consecutive_days_extend_streak() {
        let mut store = AnalyticsStore::new();
        for day in [10, 11, 12] {
            store.record(completed(day));
        }
        assert_eq!(store.overall().current_streak, 3);
        assert_eq!(store.overall().longest_streak, 3);

        store.record(completed(14));
        assert_eq!(store.overall().current_streak, 1);
        assert_eq!(store.overall().longest_streak, 3);
        assert_eq!(
            store.overall().last_session_date,
            Some(at(14, 0).date_naive())
        );
    }

    #[test]
    fn test_same_day_keeps_streak() {
        let mut store = AnalyticsStore::new();
        store.record(completed(10));
        store.record(completed(11));
        store.record(session(at(11, 23), "go", Difficulty::Hard, 100.0, 90.0, true));
        assert_eq!(store.overall().current_streak, 2);
    }

    #[test]
    fn test_incomplete_sessions_do_not_count() {
        let mut store = AnalyticsStore::new();
        store.record(completed(10));
        store.record(session(at(11, 9), "rust", Difficulty::Easy, 100.0, 50.0, false));
        assert_eq!(store.overall().current_streak, 1);
        assert_eq!(
            store.overall().last_session_date,
            Some(at(10, 0).date_naive())
        );

        store.record(completed(11));
        assert_eq!(store.overall().current_streak, 2);
    }

    #[test]
    fn test_earlier_date_resets_streak() {
        let mut store = AnalyticsStore::new();
        store.record(completed(10));
        store.record(completed(11));
        store.record(completed(5));
        assert_eq!(store.overall().current_streak, 1);
        assert_eq!(store.overall().longest_streak, 2);
        assert_eq!(
            store.overall().last_session_date,
            Some(at(5, 0).date_naive())
        );
    }

    #[test]
    fn test_first_completed_session_starts_streak() {
        let mut stats = OverallStats::default();
        update(&mut stats, &completed(20));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
    }
}
