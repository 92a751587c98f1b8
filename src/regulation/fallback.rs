//! Grid top-up of one equipment when solar delivered too little energy.
//!
//! The equipment is typically a water heater: if at `check_hour` the energy it
//! received today and over the last two days is below the configured floors,
//! it is forced to full power for exactly as long as it takes to reach the
//! one-day floor.

use chrono::{DateTime, FixedOffset, TimeDelta, Timelike};
use tracing::{info, warn};

use crate::equipment::{Equipment, EquipmentContext};

/// Thresholds and schedule of the low-energy fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackParams {
    /// Local hour at which the check runs (entering this hour).
    pub check_hour: u32,
    /// Local hour at which today's energy is kept as "yesterday" (entering this hour).
    pub snapshot_hour: u32,
    /// Minimum energy over yesterday and today (Wh).
    pub two_day_floor_wh: f64,
    /// Minimum energy today (Wh).
    pub one_day_floor_wh: f64,
}

impl Default for FallbackParams {
    fn default() -> Self {
        Self {
            check_hour: 16,
            snapshot_hour: 23,
            two_day_floor_wh: 4000.0,
            one_day_floor_wh: 2000.0,
        }
    }
}

/// Fallback state: which equipment it serves and what it received yesterday.
#[derive(Debug, Clone)]
pub struct LowEnergyFallback {
    equipment: usize,
    params: FallbackParams,
    energy_yesterday_wh: f64,
}

/// True when going from `last` to `now` enters `hour`.
fn entered_hour(last: DateTime<FixedOffset>, now: DateTime<FixedOffset>, hour: u32) -> bool {
    last.hour() == (hour + 23) % 24 && now.hour() == hour
}

impl LowEnergyFallback {
    /// Creates a fallback serving the equipment at `equipment` in the priority list.
    pub fn new(equipment: usize, params: FallbackParams) -> Self {
        Self {
            equipment,
            params,
            energy_yesterday_wh: 0.0,
        }
    }

    /// Index of the served equipment in the priority list.
    pub fn equipment_index(&self) -> usize {
        self.equipment
    }

    /// Schedule and floors in use.
    pub fn params(&self) -> &FallbackParams {
        &self.params
    }

    /// Energy kept at the last snapshot hour (Wh).
    pub fn energy_yesterday_wh(&self) -> f64 {
        self.energy_yesterday_wh
    }

    /// Forcing duration needed to reach the one-day floor, if the floors are not met.
    pub fn top_up(&self, energy_today_wh: f64, max_power_w: i64) -> Option<TimeDelta> {
        let p = &self.params;
        let low_two_days = self.energy_yesterday_wh + energy_today_wh < p.two_day_floor_wh;
        let low_today = energy_today_wh < p.one_day_floor_wh;
        if !(low_two_days && low_today) || max_power_w <= 0 {
            return None;
        }

        let secs = 3600.0 * (p.one_day_floor_wh - energy_today_wh) / max_power_w as f64;
        TimeDelta::try_milliseconds((secs * 1000.0).round() as i64)
    }

    /// Checks the hour boundaries crossed between the previous tick and `now`.
    ///
    /// Returns the forcing duration when the equipment was forced. The forcing
    /// is never lifted here; it lapses on its own.
    pub fn run(
        &mut self,
        equipment: &mut Equipment,
        last: DateTime<FixedOffset>,
        ctx: &mut EquipmentContext<'_>,
    ) -> Option<TimeDelta> {
        let now = ctx.now;
        let energy_today_wh = equipment.energy_wh();

        if entered_hour(last, now, self.params.snapshot_hour) {
            self.energy_yesterday_wh = energy_today_wh;
            info!(
                equipment = equipment.name(),
                energy_wh = energy_today_wh,
                "kept today's energy for tomorrow's fallback check"
            );
        }

        if !entered_hour(last, now, self.params.check_hour) {
            return None;
        }

        let Some(max_power_w) = equipment.max_power_w() else {
            warn!(
                equipment = equipment.name(),
                "fallback equipment has no maximum power, skipping"
            );
            return None;
        };

        let duration = self.top_up(energy_today_wh, max_power_w)?;
        info!(
            equipment = equipment.name(),
            energy_today_wh,
            energy_yesterday_wh = self.energy_yesterday_wh,
            power_w = max_power_w,
            duration_secs = duration.num_seconds(),
            "daily energy fallback: forcing equipment"
        );
        equipment.force(Some(max_power_w), Some(duration), ctx);
        Some(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::{Power, RecordingActuator};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("valid offset")
            .with_ymd_and_hms(2024, 6, 1, h, m, 0)
            .unwrap()
    }

    #[test]
    fn hour_entry_detects_boundaries_only() {
        assert!(entered_hour(at(15, 59), at(16, 0), 16));
        assert!(!entered_hour(at(16, 0), at(16, 1), 16));
        assert!(!entered_hour(at(14, 59), at(16, 0), 16));
        assert!(entered_hour(at(23, 59), at(0, 0), 0));
    }

    #[test]
    fn top_up_covers_exact_shortfall_at_full_power() {
        let fallback = LowEnergyFallback::new(0, FallbackParams::default());
        assert_eq!(fallback.top_up(800.0, 2400), Some(TimeDelta::seconds(1800)));
        assert_eq!(fallback.top_up(2000.0, 2400), None);
    }

    #[test]
    fn enough_energy_yesterday_skips_top_up() {
        let mut fallback = LowEnergyFallback::new(0, FallbackParams::default());
        fallback.energy_yesterday_wh = 3500.0;
        assert_eq!(fallback.top_up(1000.0, 2400), None);
    }

    #[test]
    fn forces_equipment_when_entering_check_hour() {
        let mut actuator = RecordingActuator::default();
        let mut heater = Equipment::variable("water_heater", 2400);
        let mut fallback = LowEnergyFallback::new(0, FallbackParams::default());

        let mut ctx = EquipmentContext::new(at(15, 30), &mut actuator);
        assert_eq!(fallback.run(&mut heater, at(15, 0), &mut ctx), None);

        let mut ctx = EquipmentContext::new(at(16, 0), &mut actuator);
        let duration = fallback.run(&mut heater, at(15, 59), &mut ctx);
        assert_eq!(duration, Some(TimeDelta::seconds(3000)));
        assert!(heater.is_forced());
        assert_eq!(heater.current_power(), Power::Watts(2400));
        assert_eq!(heater.forced_until(), Some(at(16, 50)));
    }

    #[test]
    fn snapshot_hour_keeps_today_energy() {
        let mut actuator = RecordingActuator::default();
        let mut heater = Equipment::variable("water_heater", 2400);
        heater.set_current_power(Power::Watts(1200), &mut EquipmentContext::new(at(21, 0), &mut actuator));
        heater.set_current_power(Power::Watts(0), &mut EquipmentContext::new(at(22, 0), &mut actuator));

        let mut fallback = LowEnergyFallback::new(0, FallbackParams::default());
        let mut ctx = EquipmentContext::new(at(23, 0), &mut actuator);
        fallback.run(&mut heater, at(22, 59), &mut ctx);
        assert!((fallback.energy_yesterday_wh() - 1200.0).abs() < 1e-9);
    }
}
