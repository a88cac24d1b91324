use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::result::SessionMetrics;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub wpm: u32,
    pub accuracy: u32,
}

/// A user's persistent progress. Owned by the account store; changed here
/// only through [`ProgressPatch`]es.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProgress {
    pub best_wpm: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub last_test_date: Option<NaiveDate>,
    pub test_history: Vec<HistoryEntry>,
    pub total_tests: u32,
    pub completed_tasks: BTreeSet<u32>,
    pub coins: u32,
}

/// Merge patch for [`UserProgress`]. Only the fields that are `Some` change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_wpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_history: Option<Vec<HistoryEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tests: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_tasks: Option<BTreeSet<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<u32>,
}

impl ProgressPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl UserProgress {
    pub fn apply(&mut self, patch: &ProgressPatch) {
        if let Some(streak) = patch.streak {
            self.streak = streak;
        }
        if let Some(best_streak) = patch.best_streak {
            self.best_streak = best_streak;
        }
        if let Some(date) = patch.last_test_date {
            self.last_test_date = Some(date);
        }
        if let Some(best_wpm) = patch.best_wpm {
            self.best_wpm = best_wpm;
        }
        if let Some(ref history) = patch.test_history {
            self.test_history = history.clone();
        }
        if let Some(total) = patch.total_tests {
            self.total_tests = total;
        }
        if let Some(ref completed) = patch.completed_tasks {
            self.completed_tasks = completed.clone();
        }
        if let Some(coins) = patch.coins {
            self.coins = coins;
        }
    }

    pub fn applied(mut self, patch: &ProgressPatch) -> Self {
        self.apply(patch);
        self
    }
}

/// Streak after a session on `today`: same day keeps it, the next calendar
/// day extends it, anything else (first session, gap, date going backwards)
/// starts over at 1.
pub fn next_streak(prior_streak: u32, last_test_date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_test_date {
        None => 1,
        Some(last) if last == today => prior_streak,
        Some(last) if last.succ_opt() == Some(today) => prior_streak + 1,
        Some(_) => 1,
    }
}

/// Fold a finished session into the user's streak, best score and history.
///
/// Sessions with no measured speed leave progress untouched and return `None`.
pub fn update_progress(
    prior: &UserProgress,
    metrics: &SessionMetrics,
    now: DateTime<Utc>,
) -> Option<ProgressPatch> {
    if metrics.wpm == 0 {
        debug!("zero-speed session, progress unchanged");
        return None;
    }

    let today = now.date_naive();
    let streak = next_streak(prior.streak, prior.last_test_date, today);

    let mut history = prior.test_history.clone();
    history.push(HistoryEntry {
        date: now,
        wpm: metrics.wpm,
        accuracy: metrics.accuracy,
    });

    debug!(
        streak,
        prior_streak = prior.streak,
        wpm = metrics.wpm,
        "progress updated"
    );

    Some(ProgressPatch {
        streak: Some(streak),
        best_streak: Some(prior.best_streak.max(streak)),
        last_test_date: Some(today),
        best_wpm: Some(prior.best_wpm.max(metrics.wpm)),
        test_history: Some(history),
        total_tests: Some(prior.total_tests.saturating_add(1)),
        ..ProgressPatch::default()
    })
}

/// Derived fields recomputed from history alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RebuiltProgress {
    pub streak: u32,
    pub best_streak: u32,
    pub last_test_date: Option<NaiveDate>,
    pub best_wpm: u32,
    pub total_tests: u32,
}

impl RebuiltProgress {
    /// Patch that repairs `prior` from the replay without lowering its best
    /// score or best streak. History that ends before the stored test date
    /// (or is empty) cannot account for the current streak, so the stored
    /// streak and date are kept.
    pub fn reconcile(self, prior: &UserProgress) -> ProgressPatch {
        let covers_latest =
            self.last_test_date.is_some() && self.last_test_date >= prior.last_test_date;
        let (streak, last_test_date) = if covers_latest {
            (self.streak, self.last_test_date)
        } else {
            (prior.streak, None)
        };
        ProgressPatch {
            streak: Some(streak),
            best_streak: Some(prior.best_streak.max(self.best_streak).max(streak)),
            last_test_date,
            best_wpm: Some(prior.best_wpm.max(self.best_wpm)),
            total_tests: Some(prior.total_tests.max(self.total_tests)),
            ..ProgressPatch::default()
        }
    }
}

/// Replay history oldest to newest with the same streak rule as
/// [`update_progress`].
pub fn rebuild_from_history(history: &[HistoryEntry]) -> RebuiltProgress {
    let mut rebuilt = RebuiltProgress::default();
    for entry in history {
        if entry.wpm == 0 {
            continue;
        }
        let day = entry.date.date_naive();
        rebuilt.streak = next_streak(rebuilt.streak, rebuilt.last_test_date, day);
        rebuilt.best_streak = rebuilt.best_streak.max(rebuilt.streak);
        rebuilt.last_test_date = Some(day);
        rebuilt.best_wpm = rebuilt.best_wpm.max(entry.wpm);
        rebuilt.total_tests += 1;
    }
    rebuilt
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn metrics(wpm: u32, accuracy: u32) -> SessionMetrics {
        SessionMetrics {
            wpm,
            accuracy,
            time: 30.0,
        }
    }

    fn progress_on(last: &str, streak: u32) -> UserProgress {
        UserProgress {
            streak,
            best_streak: streak,
            last_test_date: Some(date(last)),
            ..UserProgress::default()
        }
    }

    #[test]
    fn first_session_starts_streak() {
        let patch = update_progress(&UserProgress::default(), &metrics(40, 95), at(2024, 1, 1)).unwrap();
        assert_eq!(patch.streak, Some(1));
        assert_eq!(patch.last_test_date, Some(date("2024-01-01")));
        assert_eq!(patch.best_wpm, Some(40));
        assert_eq!(patch.total_tests, Some(1));
    }

    #[test]
    fn consecutive_day_extends_streak() {
        let prior = progress_on("2024-01-01", 4);
        let patch = update_progress(&prior, &metrics(40, 95), at(2024, 1, 2)).unwrap();
        assert_eq!(patch.streak, Some(5));
        assert_eq!(patch.best_streak, Some(5));
    }

    #[test]
    fn gap_breaks_streak() {
        let prior = progress_on("2024-01-01", 4);
        let patch = update_progress(&prior, &metrics(40, 95), at(2024, 1, 5)).unwrap();
        assert_eq!(patch.streak, Some(1));
        assert_eq!(patch.best_streak, Some(4));
    }

    #[test]
    fn same_day_does_not_double_count() {
        let prior = progress_on("2024-01-02", 3);
        let patch = update_progress(&prior, &metrics(40, 95), at(2024, 1, 2)).unwrap();
        assert_eq!(patch.streak, Some(3));
    }

    #[test]
    fn streak_crosses_month_and_year_boundaries() {
        assert_eq!(next_streak(2, Some(date("2024-01-31")), date("2024-02-01")), 3);
        assert_eq!(next_streak(2, Some(date("2023-12-31")), date("2024-01-01")), 3);
        assert_eq!(next_streak(2, Some(date("2024-02-28")), date("2024-02-29")), 3);
    }

    #[test]
    fn date_going_backwards_resets() {
        assert_eq!(next_streak(6, Some(date("2024-03-10")), date("2024-03-09")), 1);
    }

    #[test]
    fn best_wpm_never_decreases() {
        let prior = UserProgress {
            best_wpm: 70,
            ..UserProgress::default()
        };
        let patch = update_progress(&prior, &metrics(50, 99), at(2024, 1, 1)).unwrap();
        assert_eq!(patch.best_wpm, Some(70));
    }

    #[test]
    fn history_is_appended() {
        let mut prior = UserProgress::default();
        prior.test_history.push(HistoryEntry {
            date: at(2023, 12, 31),
            wpm: 20,
            accuracy: 90,
        });
        let now = at(2024, 1, 1);
        let patch = update_progress(&prior, &metrics(35, 97), now).unwrap();
        let history = patch.test_history.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], prior.test_history[0]);
        assert_eq!(
            history[1],
            HistoryEntry {
                date: now,
                wpm: 35,
                accuracy: 97
            }
        );
    }

    #[test]
    fn zero_wpm_changes_nothing() {
        let prior = progress_on("2024-01-01", 4);
        assert!(update_progress(&prior, &metrics(0, 100), at(2024, 1, 2)).is_none());
    }

    #[test]
    fn repeated_call_same_day_is_stable() {
        let prior = progress_on("2024-01-01", 2);
        let now = at(2024, 1, 2);
        let first = update_progress(&prior, &metrics(40, 95), now).unwrap();
        let second = update_progress(&prior, &metrics(40, 95), now).unwrap();
        assert_eq!(first.streak, second.streak);
        assert_eq!(first.best_wpm, second.best_wpm);
    }

    #[test]
    fn apply_only_touches_patched_fields() {
        let mut progress = UserProgress {
            coins: 25,
            best_wpm: 10,
            ..UserProgress::default()
        };
        progress.apply(&ProgressPatch {
            best_wpm: Some(30),
            ..ProgressPatch::default()
        });
        assert_eq!(progress.best_wpm, 30);
        assert_eq!(progress.coins, 25);
        assert!(ProgressPatch::default().is_empty());
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = ProgressPatch {
            coins: Some(5),
            ..ProgressPatch::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"coins":5}"#);
    }

    #[test]
    fn reconcile_never_lowers_best_scores() {
        let prior = UserProgress {
            best_wpm: 80,
            best_streak: 9,
            streak: 1,
            last_test_date: Some(date("2024-01-01")),
            ..UserProgress::default()
        };
        let history = vec![HistoryEntry {
            date: at(2024, 1, 2),
            wpm: 40,
            accuracy: 90,
        }];
        let patch = rebuild_from_history(&history).reconcile(&prior);
        assert_eq!(patch.best_wpm, Some(80));
        assert_eq!(patch.best_streak, Some(9));
        assert_eq!(patch.streak, Some(1));
        assert_eq!(patch.last_test_date, Some(date("2024-01-02")));
    }

    #[test]
    fn reconcile_without_history_keeps_stored_streak() {
        let prior = UserProgress {
            best_wpm: 31,
            streak: 6,
            best_streak: 6,
            last_test_date: Some(date("2024-03-09")),
            ..UserProgress::default()
        };
        let progress = prior.clone().applied(&rebuild_from_history(&[]).reconcile(&prior));
        assert_eq!(progress, prior);
    }

    #[test]
    fn rebuild_replays_streaks() {
        let history: Vec<HistoryEntry> = [(1, 30), (2, 45), (2, 20), (3, 25), (7, 40)]
            .iter()
            .map(|&(day, wpm)| HistoryEntry {
                date: at(2024, 1, day),
                wpm,
                accuracy: 95,
            })
            .collect();
        let rebuilt = rebuild_from_history(&history);
        assert_eq!(rebuilt.streak, 1);
        assert_eq!(rebuilt.best_streak, 3);
        assert_eq!(rebuilt.best_wpm, 45);
        assert_eq!(rebuilt.total_tests, 5);
        assert_eq!(rebuilt.last_test_date, Some(date("2024-01-07")));
    }
}
