use tracing::{error, info, warn};

use crate::engine::challenge::{self, ChallengeLevel, Ladder};
use crate::engine::service::{ChallengeOutcome, PracticeOutcome, ProgressService};
use crate::error::EngineError;
use crate::session::clock::Clock;
use crate::session::input::Key;
use crate::session::result::SessionMetrics;
use crate::session::state::{LiveSnapshot, Session};
use crate::store::repository::ProgressRepository;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Typing,
    Result,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Practice,
    Challenge(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    Practice(PracticeOutcome),
    Challenge(ChallengeOutcome),
}

/// Drives one user's sessions: feeds keys and ticks into the active session
/// and records the result the moment it finishes.
pub struct App<R, C> {
    pub screen: AppScreen,
    pub mode: Mode,
    pub session: Session,
    pub last_metrics: Option<SessionMetrics>,
    pub last_outcome: Option<AttemptOutcome>,
    pub status_message: Option<String>,
    pub should_quit: bool,
    user_id: String,
    service: ProgressService<R>,
    ladder: Ladder,
    clock: C,
}

impl<R: ProgressRepository, C: Clock> App<R, C> {
    pub fn new(service: ProgressService<R>, ladder: Ladder, clock: C, user_id: &str) -> Self {
        Self {
            screen: AppScreen::Typing,
            mode: Mode::Practice,
            session: Session::new("", None),
            last_metrics: None,
            last_outcome: None,
            status_message: None,
            should_quit: false,
            user_id: user_id.to_string(),
            service,
            ladder,
            clock,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    pub fn service(&self) -> &ProgressService<R> {
        &self.service
    }

    pub fn current_level(&self) -> Option<&ChallengeLevel> {
        match self.mode {
            Mode::Challenge(id) => self.ladder.get(id),
            Mode::Practice => None,
        }
    }

    fn begin(&mut self, mode: Mode, session: Session) {
        self.mode = mode;
        self.session = session;
        self.screen = AppScreen::Typing;
        self.last_metrics = None;
        self.last_outcome = None;
        self.status_message = None;
    }

    pub fn start_practice(&mut self, text: &str, time_limit: Option<u32>) {
        self.begin(Mode::Practice, Session::new(text, time_limit));
        info!(user_id = %self.user_id, chars = self.session.target().len(), ?time_limit, "practice started");
    }

    /// Challenges are untimed: the goal is the whole text at the level's pace.
    pub fn start_challenge(&mut self, level_id: u32) -> Result<(), EngineError> {
        let level = self
            .ladder
            .get(level_id)
            .ok_or(EngineError::UnknownLevel(level_id))?;
        let progress = self.service.progress(&self.user_id)?;
        if !challenge::is_unlocked(level_id, &progress.completed_tasks) {
            warn!(user_id = %self.user_id, level = level_id, "locked level requested");
            return Err(EngineError::LevelLocked(level_id));
        }
        let session = Session::new(&level.text, None);
        self.begin(Mode::Challenge(level_id), session);
        info!(user_id = %self.user_id, level = level_id, "challenge started");
        Ok(())
    }

    /// The lowest open level for this user, if any remain.
    pub fn next_challenge_id(&self) -> Result<Option<u32>, EngineError> {
        let progress = self.service.progress(&self.user_id)?;
        Ok(self
            .ladder
            .next_unlocked(&progress.completed_tasks)
            .map(|level| level.id))
    }

    pub fn retry(&mut self) {
        let mode = self.mode;
        let mut session = self.session.clone();
        session.reset();
        self.begin(mode, session);
    }

    /// After a challenge result, move on to the following level when it is open.
    pub fn continue_ladder(&mut self) -> Result<(), EngineError> {
        match self.next_challenge_id()? {
            Some(id) => self.start_challenge(id),
            None => {
                self.status_message = Some("Every level is complete".to_string());
                Ok(())
            }
        }
    }

    pub fn type_key(&mut self, key: Key) {
        if self.screen != AppScreen::Typing {
            return;
        }
        let now = self.clock.now();
        // A key pressed after the deadline must not count.
        self.session.advance(now);
        if !self.session.is_finished() {
            self.session.on_key(key, now);
        }
        self.after_transition();
    }

    pub fn on_tick(&mut self) {
        if self.screen != AppScreen::Typing {
            return;
        }
        self.session.advance(self.clock.now());
        self.after_transition();
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.session.snapshot(self.clock.now())
    }

    fn after_transition(&mut self) {
        if self.session.is_finished() && self.screen == AppScreen::Typing {
            self.record_finished();
            self.screen = AppScreen::Result;
        }
    }

    fn record_finished(&mut self) {
        let Some(metrics) = self.session.final_metrics() else {
            return;
        };
        self.last_metrics = Some(metrics);
        let now = self.clock.wall_now();

        let recorded = match self.mode {
            Mode::Practice => self
                .service
                .record_practice(&self.user_id, &metrics, now)
                .map(AttemptOutcome::Practice),
            Mode::Challenge(id) => match self.ladder.get(id) {
                Some(level) => self
                    .service
                    .record_challenge(&self.user_id, level, &metrics, now)
                    .map(AttemptOutcome::Challenge),
                None => Err(EngineError::UnknownLevel(id)),
            },
        };

        match recorded {
            Ok(outcome) => {
                if let AttemptOutcome::Challenge(ref c) = outcome {
                    if let Some(badge) = &c.badge_unlocked {
                        info!(user_id = %self.user_id, badge = %badge.id, "badge unlocked");
                        self.status_message = Some(format!("Badge unlocked: {}", badge.name));
                    }
                }
                self.last_outcome = Some(outcome);
            }
            Err(err) => {
                error!(user_id = %self.user_id, %err, "failed to record session");
                self.status_message = Some(format!("Could not save progress: {err}"));
            }
        }
    }
}
