use chrono::{DateTime, FixedOffset, TimeDelta};
use tracing::debug;

/// Manual override of an equipment, optionally expiring at an absolute time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Forcing {
    forced: bool,
    until: Option<DateTime<FixedOffset>>,
}

impl Forcing {
    /// Starts (`power` is `Some`) or stops (`None`) a forcing at `now`.
    ///
    /// A `duration` of `None` keeps the forcing until it is explicitly lifted,
    /// and so does a duration whose expiry is past the representable range.
    pub fn set(
        &mut self,
        power: Option<i64>,
        duration: Option<TimeDelta>,
        now: DateTime<FixedOffset>,
    ) {
        self.forced = power.is_some();
        self.until = duration.and_then(|d| {
            let until = now.checked_add_signed(d);
            if until.is_none() {
                debug!(duration_secs = d.num_seconds(), "forcing expiry out of range, no expiry");
            }
            until
        });
    }

    /// Lifts an expired forcing and returns whether the equipment is still forced.
    ///
    /// This is the only place where a forcing ends on its own.
    pub fn refresh(&mut self, now: DateTime<FixedOffset>) -> bool {
        if let Some(until) = self.until {
            if now > until {
                self.forced = false;
                self.until = None;
            }
        }
        self.forced
    }

    /// Current state, without checking expiry.
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// Absolute expiry, if any.
    pub fn until(&self) -> Option<DateTime<FixedOffset>> {
        self.until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<FixedOffset> {
        let utc = FixedOffset::east_opt(0).expect("valid offset");
        utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(i64::from(secs))
    }

    #[test]
    fn indefinite_forcing_never_expires() {
        let mut forcing = Forcing::default();
        forcing.set(Some(100), None, at(0));
        assert!(forcing.refresh(at(86_399)));
        assert_eq!(forcing.until(), None);
    }

    #[test]
    fn timed_forcing_expires_only_after_deadline() {
        let mut forcing = Forcing::default();
        forcing.set(Some(100), Some(TimeDelta::seconds(1)), at(0));
        assert!(forcing.refresh(at(1)));
        assert!(!forcing.refresh(at(2)));
        assert_eq!(forcing.until(), None);
    }

    #[test]
    fn no_power_lifts_forcing() {
        let mut forcing = Forcing::default();
        forcing.set(Some(100), None, at(0));
        forcing.set(None, None, at(5));
        assert!(!forcing.is_forced());
    }

    #[test]
    fn unrepresentable_expiry_keeps_forcing_indefinitely() {
        let mut forcing = Forcing::default();
        forcing.set(Some(100), Some(TimeDelta::MAX), at(0));
        assert!(forcing.is_forced());
        assert_eq!(forcing.until(), None);
        assert!(forcing.refresh(at(86_399)));
    }

    #[test]
    fn is_forced_does_not_expire() {
        let mut forcing = Forcing::default();
        forcing.set(Some(100), Some(TimeDelta::seconds(1)), at(0));
        assert!(forcing.is_forced());
        assert!(!forcing.refresh(at(10)));
        assert!(!forcing.is_forced());
    }
}
