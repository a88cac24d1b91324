use serde::Serialize;

use crate::engine::progress::{HistoryEntry, UserProgress};

const RECENT_WINDOW: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_tests: u32,
    pub best_wpm: u32,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub recent_average_wpm: f64,
    pub streak: u32,
    pub best_streak: u32,
    pub coins: u32,
    pub levels_completed: usize,
}

fn mean(entries: &[HistoryEntry], field: impl Fn(&HistoryEntry) -> u32) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| field(e) as f64).sum::<f64>() / entries.len() as f64
}

pub fn summarize(progress: &UserProgress) -> ProgressSummary {
    let history = &progress.test_history;
    let recent_start = history.len().saturating_sub(RECENT_WINDOW);

    ProgressSummary {
        total_tests: progress.total_tests,
        best_wpm: progress.best_wpm,
        average_wpm: mean(history, |e| e.wpm),
        average_accuracy: mean(history, |e| e.accuracy),
        recent_average_wpm: mean(&history[recent_start..], |e| e.wpm),
        streak: progress.streak,
        best_streak: progress.best_streak,
        coins: progress.coins,
        levels_completed: progress.completed_tasks.len(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_empty_history() {
        let summary = summarize(&UserProgress::default());
        assert_eq!(summary.average_wpm, 0.0);
        assert_eq!(summary.recent_average_wpm, 0.0);
    }

    #[test]
    fn test_recent_average_uses_last_ten() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let test_history: Vec<HistoryEntry> = (1..=12)
            .map(|i| HistoryEntry {
                date,
                wpm: i * 10,
                accuracy: 90,
            })
            .collect();
        let progress = UserProgress {
            total_tests: 12,
            test_history,
            ..UserProgress::default()
        };
        let summary = summarize(&progress);
        assert!((summary.average_wpm - 65.0).abs() < 1e-9);
        // last ten: 30..=120
        assert!((summary.recent_average_wpm - 75.0).abs() < 1e-9);
        assert!((summary.average_accuracy - 90.0).abs() < 1e-9);
    }
}
