use chrono::{DateTime, FixedOffset};

use super::types::Power;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Time integral of an equipment's power, in watt-hours.
///
/// Integration happens only when the power is about to change (or on reset):
/// the elapsed interval is charged at the power level that was in effect
/// during it. Reading the total does not flush the interval in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyAccumulator {
    energy_wh: f64,
    last_change: Option<DateTime<FixedOffset>>,
}

impl EnergyAccumulator {
    /// Charges the interval since the last change at `previous` and restarts it at `now`.
    ///
    /// Unmetered draw contributes nothing.
    pub fn integrate(&mut self, previous: Power, now: DateTime<FixedOffset>) {
        if let (Some(last), Some(watts)) = (self.last_change, previous.watts()) {
            let elapsed_secs = (now - last).num_milliseconds() as f64 / 1000.0;
            self.energy_wh += watts as f64 * elapsed_secs / SECONDS_PER_HOUR;
        }
        self.last_change = Some(now);
    }

    /// Accumulated energy up to the last change.
    pub fn total_wh(&self) -> f64 {
        self.energy_wh
    }

    /// Flushes the pending interval, zeroes the counter and returns the previous total.
    pub fn reset(&mut self, current: Power, now: DateTime<FixedOffset>) -> f64 {
        self.integrate(current, now);
        std::mem::take(&mut self.energy_wh)
    }

    /// Time of the last integration.
    pub fn last_change(&self) -> Option<DateTime<FixedOffset>> {
        self.last_change
    }
}
