use std::cell::Cell;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of time for driving sessions and stamping results.
pub trait Clock {
    /// Monotonic instant used for session timing.
    fn now(&self) -> Instant;
    /// Wall-clock time used for history entries and streak dates.
    fn wall_now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Monotonic and wall time advance together.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    offset: Cell<Duration>,
}

impl ManualClock {
    pub fn new(wall_origin: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            wall_origin,
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        // Offsets here are test-scale; a failed conversion just pins the wall clock.
        match chrono::Duration::from_std(self.offset.get()) {
            Ok(offset) => self.wall_origin + offset,
            Err(_) => self.wall_origin,
        }
    }
}
