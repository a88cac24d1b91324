use std::time::Instant;

use crate::session::state::{FinishReason, Session, SessionStatus};

/// The only multi-character key token the engine understands.
pub const BACKSPACE: &str = "Backspace";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
}

impl Key {
    /// Map a host key token to a `Key`. Anything that is neither a single
    /// printable character nor `"Backspace"` is dropped.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == BACKSPACE {
            return Some(Key::Backspace);
        }
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => Some(Key::Char(ch)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Correct,
    Incorrect { expected: char, actual: char },
    Deleted,
}

pub fn process_char(session: &mut Session, ch: char, now: Instant) -> Option<KeyOutcome> {
    if session.status == SessionStatus::Finished || ch.is_control() {
        return None;
    }
    let idx = session.typed.len();
    let expected = *session.target.get(idx)?;

    if session.status == SessionStatus::Waiting {
        session.start(now);
    }

    session.typed.push(ch);
    let outcome = if ch == expected {
        KeyOutcome::Correct
    } else {
        session.error_count += 1;
        KeyOutcome::Incorrect {
            expected,
            actual: ch,
        }
    };

    if session.typed.len() == session.target.len() {
        session.finish(now, FinishReason::Completed);
    }

    Some(outcome)
}

pub fn process_backspace(session: &mut Session) -> Option<KeyOutcome> {
    if session.status == SessionStatus::Finished {
        return None;
    }
    session.typed.pop().map(|_| KeyOutcome::Deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(Key::parse("a"), Some(Key::Char('a')));
        assert_eq!(Key::parse(" "), Some(Key::Char(' ')));
        assert_eq!(Key::parse("é"), Some(Key::Char('é')));
        assert_eq!(Key::parse("Backspace"), Some(Key::Backspace));
        assert_eq!(Key::parse("Shift"), None);
        assert_eq!(Key::parse("ArrowLeft"), None);
        assert_eq!(Key::parse(""), None);
        assert_eq!(Key::parse("\t"), None);
    }

    #[test]
    fn test_wrong_char_counts_error() {
        let t0 = Instant::now();
        let mut session = Session::new("abc", None);
        let outcome = process_char(&mut session, 'x', t0);
        assert_eq!(
            outcome,
            Some(KeyOutcome::Incorrect {
                expected: 'a',
                actual: 'x'
            })
        );
        assert_eq!(session.error_count(), 1);
        assert_eq!(session.typed_text(), "x");
    }

    #[test]
    fn test_backspace_keeps_error_count() {
        let t0 = Instant::now();
        let mut session = Session::new("abc", None);
        process_char(&mut session, 'x', t0);
        assert_eq!(process_backspace(&mut session), Some(KeyOutcome::Deleted));
        process_char(&mut session, 'a', t0);
        assert_eq!(session.typed_text(), "a");
        assert_eq!(session.error_count(), 1);
        assert_eq!(session.correct_count(), 1);
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let mut session = Session::new("abc", None);
        assert_eq!(process_backspace(&mut session), None);
        assert!(session.typed().is_empty());
    }

    #[test]
    fn test_chars_beyond_target_rejected() {
        let t0 = Instant::now();
        let mut session = Session::new("ab", None);
        process_char(&mut session, 'a', t0);
        process_char(&mut session, 'b', t0);
        assert!(process_char(&mut session, 'c', t0).is_none());
        assert_eq!(session.typed_text(), "ab");
    }

    #[test]
    fn test_finished_session_ignores_backspace() {
        let t0 = Instant::now();
        let mut session = Session::new("a", None);
        process_char(&mut session, 'a', t0);
        assert!(session.is_finished());
        assert!(process_backspace(&mut session).is_none());
        assert_eq!(session.typed_text(), "a");
    }

    #[test]
    fn test_multibyte_target_indexes_by_char() {
        let t0 = Instant::now();
        let mut session = Session::new("żółw", None);
        for ch in "żółw".chars() {
            process_char(&mut session, ch, t0);
        }
        assert!(session.is_finished());
        assert_eq!(session.correct_count(), 4);
    }
}
