//! Controllable loads and the state they carry between evaluations.

/// Actuator implementations.
pub mod actuator;
/// On/off load with a known draw.
pub mod constant;
/// Energy integration.
pub mod energy;
/// Manual override with optional expiry.
pub mod forcing;
pub mod types;
/// On/off load without metering.
pub mod unknown;
/// Continuously regulated load.
pub mod variable;

use chrono::{DateTime, FixedOffset, TimeDelta};
use tracing::{debug, warn};

pub use actuator::{JsonLinesActuator, LogActuator, RecordingActuator};
pub use constant::ConstantPower;
pub use energy::EnergyAccumulator;
pub use forcing::Forcing;
pub use types::{Actuator, ActuatorCommand, Adjustment, EquipmentContext, Power, PowerOutcome};
pub use unknown::UnknownPower;
pub use variable::VariablePower;

/// How an equipment's power can be controlled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EquipmentKind {
    Variable(VariablePower),
    Constant(ConstantPower),
    Unknown(UnknownPower),
}

impl EquipmentKind {
    /// Lowercase variant name, as written in configuration files.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Variable(_) => "variable",
            Self::Constant(_) => "constant",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// One controllable load.
///
/// Every power change goes through [`Equipment::set_current_power`], which
/// charges the elapsed interval to the energy counter before switching level
/// and then emits one actuator command.
#[derive(Debug, Clone)]
pub struct Equipment {
    name: String,
    kind: EquipmentKind,
    current_power: Power,
    energy: EnergyAccumulator,
    forcing: Forcing,
}

impl Equipment {
    /// Creates an idle equipment. Its actuator is not touched until the first power change.
    pub fn new(name: impl Into<String>, kind: EquipmentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            current_power: Power::Watts(0),
            energy: EnergyAccumulator::default(),
            forcing: Forcing::default(),
        }
    }

    /// Creates an idle variable-power equipment with the default floors.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique equipment name, also the actuator address
    /// * `max_power_w` - Full-load draw in watts
    pub fn variable(name: impl Into<String>, max_power_w: i64) -> Self {
        Self::new(name, EquipmentKind::Variable(VariablePower::new(max_power_w)))
    }

    /// Creates an idle on/off equipment with a known draw.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique equipment name, also the actuator address
    /// * `nominal_power_w` - Draw in watts while switched on
    pub fn constant(name: impl Into<String>, nominal_power_w: i64) -> Self {
        Self::new(name, EquipmentKind::Constant(ConstantPower::new(nominal_power_w)))
    }

    /// Creates an idle on/off equipment whose draw is not metered.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique equipment name, also the actuator address
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(name, EquipmentKind::Unknown(UnknownPower))
    }

    /// Equipment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant model.
    pub fn kind(&self) -> &EquipmentKind {
        &self.kind
    }

    /// Full-load draw of a variable equipment.
    pub fn max_power_w(&self) -> Option<i64> {
        match self.kind {
            EquipmentKind::Variable(v) => Some(v.max_power_w),
            _ => None,
        }
    }

    /// Sheds up to `watts` and returns how much was actually freed.
    pub fn decrease_power_by(&mut self, watts: i64, ctx: &mut EquipmentContext<'_>) -> PowerOutcome {
        let adjustment = match self.kind {
            EquipmentKind::Variable(v) => v.decrease(self.current_power, watts),
            EquipmentKind::Constant(c) => c.decrease(self.current_power, watts),
            EquipmentKind::Unknown(u) => u.decrease(self.current_power, watts),
        };
        debug!(
            equipment = %self.name,
            requested_w = watts,
            from = %self.current_power,
            outcome = ?adjustment.outcome,
            "decrease"
        );
        self.apply(adjustment, ctx)
    }

    /// Absorbs up to `watts` and returns the leftover (negative: shortfall).
    pub fn increase_power_by(&mut self, watts: i64, ctx: &mut EquipmentContext<'_>) -> PowerOutcome {
        let adjustment = match self.kind {
            EquipmentKind::Variable(v) => v.increase(self.current_power, watts),
            EquipmentKind::Constant(c) => c.increase(self.current_power, watts),
            EquipmentKind::Unknown(u) => u.increase(self.current_power, watts),
        };
        debug!(
            equipment = %self.name,
            available_w = watts,
            from = %self.current_power,
            outcome = ?adjustment.outcome,
            "increase"
        );
        self.apply(adjustment, ctx)
    }

    fn apply(&mut self, adjustment: Adjustment, ctx: &mut EquipmentContext<'_>) -> PowerOutcome {
        if let Some(target) = adjustment.target {
            self.set_current_power(target, ctx);
        }
        adjustment.outcome
    }

    /// Pins the equipment to `power` (`None` lifts the forcing and switches it off).
    ///
    /// `duration` of `None` keeps the forcing until lifted.
    pub fn force(
        &mut self,
        power: Option<i64>,
        duration: Option<TimeDelta>,
        ctx: &mut EquipmentContext<'_>,
    ) {
        self.forcing.set(power, duration, ctx.now);
        let target = match self.kind {
            EquipmentKind::Variable(v) => v.forced(power),
            EquipmentKind::Constant(c) => c.forced(power),
            EquipmentKind::Unknown(u) => u.forced(power),
        };
        self.set_current_power(target, ctx);
    }

    /// Integrates energy at the previous level, switches to `power` and notifies the actuator.
    ///
    /// Setting the same value again still restarts the integration interval.
    pub fn set_current_power(&mut self, power: Power, ctx: &mut EquipmentContext<'_>) {
        self.energy.integrate(self.current_power, ctx.now);
        self.current_power = power;

        let command = match self.kind {
            EquipmentKind::Variable(v) => ActuatorCommand::Percent(v.percent(power)),
            EquipmentKind::Constant(_) | EquipmentKind::Unknown(_) => {
                ActuatorCommand::Switch(!power.is_off())
            }
        };
        debug!(equipment = %self.name, %power, %command, "power command");
        if let Err(e) = ctx.actuator.send(&self.name, command) {
            warn!(equipment = %self.name, error = %e, "actuator command not delivered");
        }
    }

    /// Power last commanded.
    pub fn current_power(&self) -> Power {
        self.current_power
    }

    /// Energy accumulated up to the last power change (Wh).
    pub fn energy_wh(&self) -> f64 {
        self.energy.total_wh()
    }

    /// Flushes and zeroes the energy counter, returning the previous total (Wh).
    pub fn reset_energy(&mut self, now: DateTime<FixedOffset>) -> f64 {
        self.energy.reset(self.current_power, now)
    }

    /// Expires a lapsed forcing and returns whether the equipment remains forced.
    ///
    /// The power level is left as it is when a forcing expires.
    pub fn refresh_forced(&mut self, now: DateTime<FixedOffset>) -> bool {
        let was_forced = self.forcing.is_forced();
        let forced = self.forcing.refresh(now);
        if was_forced && !forced {
            debug!(equipment = %self.name, "forcing expired");
        }
        forced
    }

    /// Forced state as of the last refresh.
    pub fn is_forced(&self) -> bool {
        self.forcing.is_forced()
    }

    /// Expiry of the current forcing; `None` when indefinite or not forced.
    pub fn forced_until(&self) -> Option<DateTime<FixedOffset>> {
        self.forcing.until()
    }
}
