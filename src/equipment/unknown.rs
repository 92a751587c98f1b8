use super::types::{Adjustment, Power, PowerOutcome};

/// An on/off load whose draw is not metered.
///
/// Switching it either way has an effect only the next consumption reading can
/// reveal, so automatic adjustments report [`PowerOutcome::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnknownPower;

impl UnknownPower {
    /// Switches off; the freed power is unknown.
    pub fn decrease(&self, current: Power, _watts: i64) -> Adjustment {
        if current.is_off() {
            Adjustment::unchanged(PowerOutcome::Known(0))
        } else {
            Adjustment::to(Power::Watts(0), PowerOutcome::Unknown)
        }
    }

    /// Switches on when off; an equipment already on passes `watts` through.
    pub fn increase(&self, current: Power, watts: i64) -> Adjustment {
        if current.is_off() {
            Adjustment::to(Power::Unknown, PowerOutcome::Unknown)
        } else {
            Adjustment::unchanged(PowerOutcome::Known(watts))
        }
    }

    /// Forced level: `power` watts, or off when lifting.
    pub fn forced(&self, power: Option<i64>) -> Power {
        Power::Watts(power.unwrap_or(0).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switching_off_has_unknown_effect() {
        let adj = UnknownPower.decrease(Power::Unknown, 100);
        assert_eq!(adj.target, Some(Power::Watts(0)));
        assert_eq!(adj.outcome, PowerOutcome::Unknown);
    }

    #[test]
    fn switching_on_has_unknown_effect() {
        let adj = UnknownPower.increase(Power::Watts(0), 100);
        assert_eq!(adj.target, Some(Power::Unknown));
        assert_eq!(adj.outcome, PowerOutcome::Unknown);
    }

    #[test]
    fn already_in_requested_state_is_known() {
        assert_eq!(
            UnknownPower.decrease(Power::Watts(0), 100),
            Adjustment::unchanged(PowerOutcome::Known(0))
        );
        assert_eq!(
            UnknownPower.increase(Power::Unknown, 100),
            Adjustment::unchanged(PowerOutcome::Known(100))
        );
    }
}
