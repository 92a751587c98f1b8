use super::types::{Adjustment, Power, PowerOutcome};

/// Lowest power at which the regulator drives the load reliably (W).
pub const MINIMUM_POWER_W: i64 = 150;

/// Lowest regulator setting that still conducts (%).
pub const MINIMUM_PERCENT: f64 = 4.0;

/// Response curve of the phase-angle regulator, fitted from bench measurements.
///
/// Evaluated as `G + F/z + E*z + D*z^2 + C*z^3 + B*z^4 + A*z^5` where `z` is the
/// fraction of maximum power.
const RESPONSE_A: f64 = 1156.7360635374;
const RESPONSE_B: f64 = -2733.09296216279;
const RESPONSE_C: f64 = 2365.91298447422;
const RESPONSE_D: f64 = -924.443712230202;
const RESPONSE_E: f64 = 218.242717162968;
const RESPONSE_F: f64 = -0.010002294517421;
const RESPONSE_G: f64 = 11.3205979917473;

/// A load driven continuously between 0 and `max_power_w` through a regulator.
///
/// Below `minimum_power_w` the regulator cannot hold the load steady, so the
/// automatic adjustments never leave it running there: a decrease ending under
/// the floor switches it off, and an increase that would not reach the floor
/// is refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariablePower {
    /// Full-load draw in watts.
    pub max_power_w: i64,

    /// Power floor in watts.
    pub minimum_power_w: i64,

    /// Regulator setting floor in percent.
    pub minimum_percent: f64,
}

impl VariablePower {
    /// Creates a variable-power profile with the reference regulator floors.
    pub fn new(max_power_w: i64) -> Self {
        Self::with_floor(max_power_w, MINIMUM_POWER_W, MINIMUM_PERCENT)
    }

    /// Creates a variable-power profile with explicit floors.
    ///
    /// # Arguments
    ///
    /// * `max_power_w` - Full-load draw in watts (must be > 0)
    /// * `minimum_power_w` - Lowest steady power in watts
    /// * `minimum_percent` - Lowest regulator setting in percent
    pub fn with_floor(max_power_w: i64, minimum_power_w: i64, minimum_percent: f64) -> Self {
        Self {
            max_power_w,
            minimum_power_w,
            minimum_percent,
        }
    }

    /// Lowers the draw by up to `watts`, switching off below the floor.
    ///
    /// Returns the watts actually freed.
    pub fn decrease(&self, current: Power, watts: i64) -> Adjustment {
        let current = current.watts().unwrap_or(0);
        let mut decrease = watts.min(current);
        if current - decrease < self.minimum_power_w {
            decrease = current;
        }

        if decrease > 0 {
            Adjustment::to(Power::Watts(current - decrease), PowerOutcome::Known(decrease))
        } else {
            Adjustment::unchanged(PowerOutcome::Known(decrease))
        }
    }

    /// Raises the draw by up to `watts`, capped at the maximum power.
    ///
    /// A level below the floor is refused and every watt is handed back.
    pub fn increase(&self, current: Power, watts: i64) -> Adjustment {
        let current = current.watts().unwrap_or(0);
        let (mut increase, mut remaining) = if current.saturating_add(watts) >= self.max_power_w {
            let increase = self.max_power_w - current;
            (increase, watts.saturating_sub(increase))
        } else {
            (watts, 0)
        };

        if current + increase < self.minimum_power_w {
            increase = 0;
            remaining = watts;
        }

        if increase > 0 {
            Adjustment::to(Power::Watts(current + increase), PowerOutcome::Known(remaining))
        } else {
            Adjustment::unchanged(PowerOutcome::Known(remaining))
        }
    }

    /// Forced level: `power` (0 when lifting) within `[0, max_power_w]`, floors ignored.
    pub fn forced(&self, power: Option<i64>) -> Power {
        Power::Watts(power.unwrap_or(0).clamp(0, self.max_power_w))
    }

    /// Regulator setting in percent for a given draw.
    pub fn percent(&self, power: Power) -> f64 {
        let watts = power.watts().unwrap_or(0);
        if watts == 0 {
            return 0.0;
        }

        let z = watts as f64 / self.max_power_w as f64;
        let percent = RESPONSE_G
            + RESPONSE_F / z
            + RESPONSE_E * z
            + RESPONSE_D * z.powi(2)
            + RESPONSE_C * z.powi(3)
            + RESPONSE_B * z.powi(4)
            + RESPONSE_A * z.powi(5);
        percent.clamp(self.minimum_percent, 100.0)
    }
}
