use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::input::{self, Key, KeyOutcome};
use crate::session::result::{self, SessionMetrics};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Waiting,
    Started,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Completed,
    TimedOut,
}

/// Live view of a session handed to the presentation layer on every key or tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LiveSnapshot {
    pub status: SessionStatus,
    pub typed_text: String,
    pub time_left: Option<u32>,
    pub live_wpm: u32,
}

/// One typing attempt against a fixed target text.
///
/// Every transition takes the current instant explicitly so that a real
/// timer, a test harness or a simulated clock can drive it.
#[derive(Clone, Debug)]
pub struct Session {
    pub(crate) target: Vec<char>,
    pub(crate) typed: Vec<char>,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: Option<Instant>,
    pub(crate) finished_at: Option<Instant>,
    pub(crate) finish_reason: Option<FinishReason>,
    pub(crate) error_count: usize,
    time_limit: Option<u32>,
    time_left: Option<u32>,
    ticks_applied: u32,
}

impl Session {
    pub fn new(text: &str, time_limit: Option<u32>) -> Self {
        Self {
            target: text.chars().collect(),
            typed: Vec::new(),
            status: SessionStatus::Waiting,
            started_at: None,
            finished_at: None,
            finish_reason: None,
            error_count: 0,
            time_limit,
            time_left: time_limit,
            ticks_applied: 0,
        }
    }

    /// Abandon the current attempt and return to `Waiting` on the same text.
    pub fn reset(&mut self) {
        debug!(status = ?self.status, typed = self.typed.len(), "session reset");
        self.typed.clear();
        self.status = SessionStatus::Waiting;
        self.started_at = None;
        self.finished_at = None;
        self.finish_reason = None;
        self.error_count = 0;
        self.time_left = self.time_limit;
        self.ticks_applied = 0;
    }

    pub fn on_key(&mut self, key: Key, now: Instant) -> Option<KeyOutcome> {
        match key {
            Key::Char(ch) => input::process_char(self, ch, now),
            Key::Backspace => input::process_backspace(self),
        }
    }

    /// Raw key token from the host (`"a"`, `"Backspace"`, `"Shift"`...).
    /// Unrecognized tokens are dropped.
    pub fn on_key_str(&mut self, raw: &str, now: Instant) -> Option<KeyOutcome> {
        Key::parse(raw).and_then(|key| self.on_key(key, now))
    }

    /// One timer tick. The scheduler calls this once per second while started.
    pub fn tick(&mut self, now: Instant) {
        if self.status != SessionStatus::Started || self.time_left.is_none() {
            return;
        }
        self.ticks_applied += 1;
        self.apply_tick(now);
    }

    /// Catch up on every whole second elapsed since the start that has not
    /// been ticked yet. Calling it more or less often never changes the outcome.
    pub fn advance(&mut self, now: Instant) {
        let Some(start) = self.started_at else {
            return;
        };
        if self.time_left.is_none() {
            return;
        }
        let elapsed_whole = now.saturating_duration_since(start).as_secs();
        while self.status == SessionStatus::Started && u64::from(self.ticks_applied) < elapsed_whole
        {
            self.ticks_applied += 1;
            let at = start + Duration::from_secs(u64::from(self.ticks_applied));
            self.apply_tick(at);
        }
    }

    fn apply_tick(&mut self, at: Instant) {
        if let Some(left) = self.time_left.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.finish(at, FinishReason::TimedOut);
            }
        }
    }

    pub(crate) fn start(&mut self, now: Instant) {
        self.status = SessionStatus::Started;
        self.started_at = Some(now);
        debug!(target_len = self.target.len(), timed = self.time_limit.is_some(), "session started");
    }

    pub(crate) fn finish(&mut self, now: Instant, reason: FinishReason) {
        if self.status == SessionStatus::Finished {
            return;
        }
        self.status = SessionStatus::Finished;
        self.finished_at = Some(now);
        self.finish_reason = Some(reason);
        debug!(?reason, typed = self.typed.len(), errors = self.error_count, "session finished");
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    pub fn typed_text(&self) -> String {
        self.typed.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.typed.len()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn time_limit(&self) -> Option<u32> {
        self.time_limit
    }

    pub fn time_left(&self) -> Option<u32> {
        self.time_left
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    /// Positions where the typed character matches the target.
    pub fn correct_count(&self) -> usize {
        self.typed
            .iter()
            .zip(self.target.iter())
            .filter(|(typed, expected)| typed == expected)
            .count()
    }

    pub fn is_correct_at(&self, idx: usize) -> Option<bool> {
        let typed = self.typed.get(idx)?;
        Some(self.target.get(idx) == Some(typed))
    }

    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).as_secs_f64(),
            (Some(start), None) => now.saturating_duration_since(start).as_secs_f64(),
            _ => 0.0,
        }
    }

    /// Speed over the currently-correct characters. Zero before the start and
    /// after a timeout.
    pub fn live_wpm(&self, now: Instant) -> u32 {
        match self.status {
            SessionStatus::Waiting => 0,
            SessionStatus::Finished if self.finish_reason == Some(FinishReason::TimedOut) => 0,
            _ => result::words_per_minute(self.correct_count(), self.elapsed_secs(now)),
        }
    }

    pub fn progress(&self) -> f64 {
        if self.target.is_empty() {
            return 0.0;
        }
        self.typed.len() as f64 / self.target.len() as f64
    }

    pub fn snapshot(&self, now: Instant) -> LiveSnapshot {
        LiveSnapshot {
            status: self.status,
            typed_text: self.typed_text(),
            time_left: self.time_left,
            live_wpm: self.live_wpm(now),
        }
    }

    pub fn final_metrics(&self) -> Option<SessionMetrics> {
        SessionMetrics::from_session(self)
    }
}
