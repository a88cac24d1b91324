use std::time::Duration;

use chrono::{TimeZone, Utc};

use typeladder::app::{App, AppScreen, AttemptOutcome, Mode};
use typeladder::content::parse_ladder;
use typeladder::engine::challenge::{self, Ladder, LevelState};
use typeladder::engine::service::{ChallengeOutcome, ProgressService};
use typeladder::error::EngineError;
use typeladder::session::clock::ManualClock;
use typeladder::session::{Key, SessionMetrics};
use typeladder::store::MemoryStore;

const LADDER: &str = r#"
[[level]]
id = 1
level_number = 1
text = "hop"
wpm_goal = 30
accuracy_goal = 95
coin_reward = 10

[[level]]
id = 2
level_number = 2
text = "skip"
wpm_goal = 30
accuracy_goal = 95
coin_reward = 0

[level.badge]
id = "two-step"
name = "Two Step"

[[level]]
id = 3
level_number = 3
text = "jump"
wpm_goal = 200
accuracy_goal = 100
coin_reward = 50
"#;

fn ladder() -> Ladder {
    parse_ladder(LADDER).unwrap()
}

fn app() -> App<MemoryStore, ManualClock> {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap());
    App::new(ProgressService::new(MemoryStore::new()), ladder(), clock, "kit")
}

fn play(app: &mut App<MemoryStore, ManualClock>, text: &str, gap: Duration) -> ChallengeOutcome {
    for ch in text.chars() {
        app.type_key(Key::Char(ch));
        app.clock().advance(gap);
    }
    assert_eq!(app.screen, AppScreen::Result);
    match app.last_outcome.clone() {
        Some(AttemptOutcome::Challenge(outcome)) => outcome,
        other => panic!("expected a challenge outcome, got {other:?}"),
    }
}

#[test]
fn ladder_unlocks_in_order_and_pays_once() {
    let mut app = app();
    assert_eq!(app.next_challenge_id().unwrap(), Some(1));
    assert!(matches!(app.start_challenge(2), Err(EngineError::LevelLocked(2))));

    app.start_challenge(1).unwrap();
    // 3 chars in 0.2s is well above 30 wpm
    let first = play(&mut app, "hop", Duration::from_millis(100));
    assert!(first.first_pass);
    assert_eq!(first.coins_awarded, 10);
    assert_eq!(first.progress.coins, 10);

    app.retry();
    let again = play(&mut app, "hop", Duration::from_millis(100));
    assert!(again.evaluation.passed);
    assert!(!again.first_pass);
    assert_eq!(again.progress.coins, 10);
    assert_eq!(again.progress.test_history.len(), 2);

    app.continue_ladder().unwrap();
    assert_eq!(app.mode, Mode::Challenge(2));
    let second = play(&mut app, "skip", Duration::from_millis(100));
    assert!(second.first_pass);
    assert_eq!(second.coins_awarded, 0);
    assert_eq!(second.badge_unlocked.as_ref().map(|b| b.name.as_str()), Some("Two Step"));
    assert_eq!(app.status_message.as_deref(), Some("Badge unlocked: Two Step"));

    let progress = app.service().progress("kit").unwrap();
    let states: Vec<LevelState> = app
        .ladder()
        .states(&progress.completed_tasks)
        .into_iter()
        .map(|(_, state)| state)
        .collect();
    assert_eq!(
        states,
        vec![LevelState::Completed, LevelState::Completed, LevelState::Unlocked]
    );
}

#[test]
fn failing_a_level_keeps_it_open() {
    let mut app = app();
    app.start_challenge(1).unwrap();
    // one mistake out of three typed: 67% accuracy
    let outcome = play(&mut app, "hxp", Duration::from_millis(100));
    assert!(!outcome.evaluation.passed);
    assert!(outcome.evaluation.wpm_met);
    assert!(!outcome.evaluation.accuracy_met);
    assert!(outcome.progress.completed_tasks.is_empty());
    assert!(outcome.progress.test_history.is_empty());
    assert_eq!(app.next_challenge_id().unwrap(), Some(1));
}

#[test]
fn thresholds_are_inclusive() {
    let level = ladder().get(1).unwrap().clone();
    let exact = SessionMetrics {
        wpm: 30,
        accuracy: 95,
        time: 1.0,
    };
    assert!(challenge::evaluate(&level, &exact).passed);
    let slow = SessionMetrics { wpm: 29, ..exact };
    assert!(!challenge::evaluate(&level, &slow).passed);
}

#[test]
fn service_refuses_skipping_ahead() {
    let ladder = ladder();
    let mut service = ProgressService::new(MemoryStore::new());
    let metrics = SessionMetrics {
        wpm: 300,
        accuracy: 100,
        time: 1.0,
    };
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
    let err = service
        .record_challenge("kit", ladder.get(3).unwrap(), &metrics, now)
        .unwrap_err();
    assert!(matches!(err, EngineError::LevelLocked(3)));
    assert_eq!(service.progress("kit").unwrap().total_tests, 0);
}
