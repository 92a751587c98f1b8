use super::types::{Adjustment, Power, PowerOutcome};

/// An on/off load with a fixed, known draw.
///
/// It cannot run partially: a decrease always recovers the whole nominal
/// power, and an increase is only accepted when the whole nominal power fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantPower {
    /// Draw in watts while switched on.
    pub nominal_power_w: i64,
}

impl ConstantPower {
    /// Creates an on/off model.
    ///
    /// # Arguments
    ///
    /// * `nominal_power_w` - Draw in watts while switched on
    pub fn new(nominal_power_w: i64) -> Self {
        Self { nominal_power_w }
    }

    /// Switches off, freeing the whole nominal power.
    pub fn decrease(&self, current: Power, _watts: i64) -> Adjustment {
        if current.is_off() {
            Adjustment::unchanged(PowerOutcome::Known(0))
        } else {
            Adjustment::to(Power::Watts(0), PowerOutcome::Known(self.nominal_power_w))
        }
    }

    /// Switches on when `watts` covers the nominal power.
    ///
    /// When it does not, nothing changes and the leftover is negative: the
    /// missing watts, which the caller may try to recover elsewhere.
    pub fn increase(&self, current: Power, watts: i64) -> Adjustment {
        if !current.is_off() {
            return Adjustment::unchanged(PowerOutcome::Known(watts));
        }

        let remaining = watts.saturating_sub(self.nominal_power_w);
        if remaining >= 0 {
            Adjustment::to(
                Power::Watts(self.nominal_power_w),
                PowerOutcome::Known(remaining),
            )
        } else {
            Adjustment::unchanged(PowerOutcome::Known(remaining))
        }
    }

    /// Forced level: on when `power` covers the nominal power, otherwise off.
    pub fn forced(&self, power: Option<i64>) -> Power {
        match power {
            Some(watts) if watts >= self.nominal_power_w => Power::Watts(self.nominal_power_w),
            _ => Power::Watts(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charger() -> ConstantPower {
        ConstantPower::new(120)
    }

    #[test]
    fn decrease_recovers_full_nominal_power() {
        let adj = charger().decrease(Power::Watts(120), 10);
        assert_eq!(adj.target, Some(Power::Watts(0)));
        assert_eq!(adj.outcome, PowerOutcome::Known(120));
    }

    #[test]
    fn decrease_when_off_recovers_nothing() {
        let adj = charger().decrease(Power::Watts(0), 500);
        assert_eq!(adj, Adjustment::unchanged(PowerOutcome::Known(0)));
    }

    #[test]
    fn increase_switches_on_when_nominal_fits() {
        let adj = charger().increase(Power::Watts(0), 200);
        assert_eq!(adj.target, Some(Power::Watts(120)));
        assert_eq!(adj.outcome, PowerOutcome::Known(80));
    }

    #[test]
    fn increase_reports_shortfall_without_switching() {
        let adj = charger().increase(Power::Watts(0), 100);
        assert_eq!(adj, Adjustment::unchanged(PowerOutcome::Known(-20)));
    }

    #[test]
    fn increase_when_on_passes_power_through() {
        let adj = charger().increase(Power::Watts(120), 300);
        assert_eq!(adj, Adjustment::unchanged(PowerOutcome::Known(300)));
    }

    #[test]
    fn forced_level_is_all_or_nothing() {
        assert_eq!(charger().forced(Some(120)), Power::Watts(120));
        assert_eq!(charger().forced(Some(119)), Power::Watts(0));
        assert_eq!(charger().forced(None), Power::Watts(0));
    }
}
