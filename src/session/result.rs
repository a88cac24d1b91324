use serde::{Deserialize, Serialize};

use crate::session::state::{Session, SessionStatus};

/// Final scores of a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub wpm: u32,
    pub accuracy: u32,
    /// Elapsed seconds between the first accepted key and the finish.
    pub time: f64,
}

impl SessionMetrics {
    /// Scores a finished session. Accuracy is measured against what was
    /// typed, not against the full target, so an attempt that stops early is
    /// graded only on the characters it reached.
    pub fn from_session(session: &Session) -> Option<Self> {
        if session.status != SessionStatus::Finished {
            return None;
        }
        let start = session.started_at?;
        let end = session.finished_at?;
        let time = end.saturating_duration_since(start).as_millis() as f64 / 1000.0;
        let correct = session.correct_count();

        Some(Self {
            wpm: words_per_minute(correct, time),
            accuracy: accuracy_percent(correct, session.typed.len()),
            time,
        })
    }
}

/// (correct characters / 5) per elapsed minute, rounded. Zero when no time
/// has elapsed.
pub fn words_per_minute(correct_chars: usize, elapsed_secs: f64) -> u32 {
    if elapsed_secs <= 0.0 {
        return 0;
    }
    let wpm = (correct_chars as f64 / 5.0) / (elapsed_secs / 60.0);
    wpm.round() as u32
}

/// Percentage of typed characters that matched, rounded into `0..=100`.
pub fn accuracy_percent(correct_chars: usize, typed_chars: usize) -> u32 {
    if typed_chars == 0 {
        return 0;
    }
    let pct = correct_chars as f64 / typed_chars as f64 * 100.0;
    pct.round().clamp(0.0, 100.0) as u32
}
