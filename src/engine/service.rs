use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::engine::challenge::{self, Badge, ChallengeLevel, Evaluation};
use crate::engine::progress::{self, ProgressPatch, UserProgress};
use crate::error::EngineError;
use crate::session::result::SessionMetrics;
use crate::store::repository::ProgressRepository;

#[derive(Clone, Debug, PartialEq)]
pub struct PracticeOutcome {
    /// `None` when the session had no measurable speed.
    pub patch: Option<ProgressPatch>,
    pub progress: UserProgress,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChallengeOutcome {
    pub level_id: u32,
    pub evaluation: Evaluation,
    /// True only the first time a level is passed.
    pub first_pass: bool,
    pub coins_awarded: u32,
    pub badge_unlocked: Option<Badge>,
    pub patch: Option<ProgressPatch>,
    pub progress: UserProgress,
}

/// Folds finished sessions into stored progress through an injected repository.
pub struct ProgressService<R> {
    repo: R,
}

impl<R: ProgressRepository> ProgressService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn progress(&self, user_id: &str) -> Result<UserProgress, EngineError> {
        Ok(self.repo.load(user_id)?)
    }

    fn commit(
        &mut self,
        user_id: &str,
        prior: UserProgress,
        patch: Option<&ProgressPatch>,
    ) -> Result<UserProgress, EngineError> {
        match patch {
            Some(patch) if !patch.is_empty() => {
                self.repo.save(user_id, patch)?;
                Ok(prior.applied(patch))
            }
            _ => Ok(prior),
        }
    }

    pub fn record_practice(
        &mut self,
        user_id: &str,
        metrics: &SessionMetrics,
        now: DateTime<Utc>,
    ) -> Result<PracticeOutcome, EngineError> {
        let prior = self.repo.load(user_id)?;
        let patch = progress::update_progress(&prior, metrics, now);
        let progress = self.commit(user_id, prior, patch.as_ref())?;
        info!(
            user_id,
            wpm = metrics.wpm,
            accuracy = metrics.accuracy,
            streak = progress.streak,
            "practice recorded"
        );
        Ok(PracticeOutcome { patch, progress })
    }

    /// Record a challenge attempt. A first pass pays out, a re-pass only
    /// counts as a practice session and a fail is discarded.
    pub fn record_challenge(
        &mut self,
        user_id: &str,
        level: &ChallengeLevel,
        metrics: &SessionMetrics,
        now: DateTime<Utc>,
    ) -> Result<ChallengeOutcome, EngineError> {
        let prior = self.repo.load(user_id)?;
        if !challenge::is_unlocked(level.id, &prior.completed_tasks) {
            warn!(user_id, level = level.id, "attempt on locked level refused");
            return Err(EngineError::LevelLocked(level.id));
        }

        let evaluation = challenge::evaluate(level, metrics);
        let reward = if evaluation.passed {
            challenge::on_pass(&prior, level, metrics, now)
        } else {
            None
        };

        let (patch, first_pass, coins_awarded, badge_unlocked) = match reward {
            Some(reward) => (Some(reward.patch), true, reward.coins_awarded, reward.badge),
            None if evaluation.passed => (
                progress::update_progress(&prior, metrics, now),
                false,
                0,
                None,
            ),
            None => (None, false, 0, None),
        };

        let progress = self.commit(user_id, prior, patch.as_ref())?;
        info!(
            user_id,
            level = level.id,
            passed = evaluation.passed,
            first_pass,
            wpm = metrics.wpm,
            accuracy = metrics.accuracy,
            "challenge recorded"
        );

        Ok(ChallengeOutcome {
            level_id: level.id,
            evaluation,
            first_pass,
            coins_awarded,
            badge_unlocked,
            patch,
            progress,
        })
    }

    /// Repair streak, best score and test count from stored history. Best
    /// values only ever go up.
    pub fn rebuild(&mut self, user_id: &str) -> Result<UserProgress, EngineError> {
        let prior = self.repo.load(user_id)?;
        let patch = progress::rebuild_from_history(&prior.test_history).reconcile(&prior);
        info!(user_id, entries = prior.test_history.len(), "progress rebuilt from history");
        self.commit(user_id, prior, Some(&patch))
    }
}
