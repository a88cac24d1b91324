use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::progress::{self, ProgressPatch, UserProgress};
use crate::error::ContentError;
use crate::session::result::SessionMetrics;

// --- Level definitions ---

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeLevel {
    pub id: u32,
    pub level_number: u32,
    pub text: String,
    pub wpm_goal: u32,
    pub accuracy_goal: u32,
    #[serde(default)]
    pub coin_reward: u32,
    #[serde(default)]
    pub badge: Option<Badge>,
}

// --- Level state ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelState {
    Locked,
    Unlocked,
    Completed,
}

/// Level 1 is always open; every other level opens once its predecessor is done.
pub fn is_unlocked(level_id: u32, completed: &BTreeSet<u32>) -> bool {
    level_id == 1 || (level_id > 1 && completed.contains(&(level_id - 1)))
}

pub fn level_state(level_id: u32, completed: &BTreeSet<u32>) -> LevelState {
    if completed.contains(&level_id) {
        LevelState::Completed
    } else if is_unlocked(level_id, completed) {
        LevelState::Unlocked
    } else {
        LevelState::Locked
    }
}

// --- Evaluation ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub passed: bool,
    pub wpm_met: bool,
    pub accuracy_met: bool,
}

/// Both goals are inclusive and must hold together.
pub fn evaluate(level: &ChallengeLevel, metrics: &SessionMetrics) -> Evaluation {
    let wpm_met = metrics.wpm >= level.wpm_goal;
    let accuracy_met = metrics.accuracy >= level.accuracy_goal;
    Evaluation {
        passed: wpm_met && accuracy_met,
        wpm_met,
        accuracy_met,
    }
}

// --- Rewards ---

#[derive(Clone, Debug, PartialEq)]
pub struct PassReward {
    pub patch: ProgressPatch,
    pub coins_awarded: u32,
    /// One-time unlock event for the presentation layer.
    pub badge: Option<Badge>,
}

/// Effects of passing `level` for the first time: progress update, level
/// completion and coins. Returns `None` for an already-completed level so
/// rewards are never paid twice.
pub fn on_pass(
    user: &UserProgress,
    level: &ChallengeLevel,
    metrics: &SessionMetrics,
    now: DateTime<Utc>,
) -> Option<PassReward> {
    if user.completed_tasks.contains(&level.id) {
        debug!(level = level.id, "level already completed, no reward");
        return None;
    }

    let mut patch = progress::update_progress(user, metrics, now).unwrap_or_default();

    let mut completed = user.completed_tasks.clone();
    completed.insert(level.id);
    patch.completed_tasks = Some(completed);
    patch.coins = Some(user.coins.saturating_add(level.coin_reward));

    info!(
        level = level.id,
        coins = level.coin_reward,
        badge = level.badge.as_ref().map(|b| b.id.as_str()),
        "level completed"
    );

    Some(PassReward {
        patch,
        coins_awarded: level.coin_reward,
        badge: level.badge.clone(),
    })
}

// --- Ladder ---

/// Validated, strictly ordered list of levels.
#[derive(Clone, Debug)]
pub struct Ladder {
    levels: Vec<ChallengeLevel>,
}

impl Ladder {
    pub fn new(levels: Vec<ChallengeLevel>) -> Result<Self, ContentError> {
        if levels.is_empty() {
            return Err(ContentError::Empty);
        }
        for (i, level) in levels.iter().enumerate() {
            let expected = i as u32 + 1;
            if level.level_number != expected {
                return Err(ContentError::OutOfOrder {
                    expected,
                    found: level.level_number,
                });
            }
            if level.id != level.level_number {
                return Err(ContentError::IdMismatch {
                    level_number: level.level_number,
                    id: level.id,
                });
            }
            if level.accuracy_goal > 100 {
                return Err(ContentError::AccuracyGoal {
                    id: level.id,
                    goal: level.accuracy_goal,
                });
            }
            // Challenges are untimed, so a level must be finishable key by key.
            if level.text.is_empty() {
                return Err(ContentError::UntypeableText {
                    id: level.id,
                    reason: "text is empty",
                });
            }
            if level.text.chars().any(char::is_control) {
                return Err(ContentError::UntypeableText {
                    id: level.id,
                    reason: "text contains a control character",
                });
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[ChallengeLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&ChallengeLevel> {
        let idx = id.checked_sub(1)? as usize;
        self.levels.get(idx)
    }

    /// Lowest-numbered level that is open but not yet completed.
    pub fn next_unlocked(&self, completed: &BTreeSet<u32>) -> Option<&ChallengeLevel> {
        self.levels
            .iter()
            .find(|level| level_state(level.id, completed) == LevelState::Unlocked)
    }

    pub fn states(&self, completed: &BTreeSet<u32>) -> Vec<(&ChallengeLevel, LevelState)> {
        self.levels
            .iter()
            .map(|level| (level, level_state(level.id, completed)))
            .collect()
    }

    pub fn completed_count(&self, completed: &BTreeSet<u32>) -> usize {
        self.levels
            .iter()
            .filter(|level| completed.contains(&level.id))
            .count()
    }
}
