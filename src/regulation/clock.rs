use std::cell::Cell;

use chrono::{DateTime, FixedOffset, Local, TimeDelta};

/// Source of wall-clock time for the live loop.
///
/// The engine itself never reads a clock: every operation receives `now`.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local time of the host, with its current UTC offset.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use chrono::{FixedOffset, TimeDelta, TimeZone};
/// use solar_regulator::regulation::clock::{Clock, ManualClock};
///
/// let start = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
/// let clock = ManualClock::new(start);
/// clock.advance(TimeDelta::seconds(5));
/// assert_eq!(clock.now(), start + TimeDelta::seconds(5));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<FixedOffset>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        self.now.set(now);
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now.get()
    }
}
