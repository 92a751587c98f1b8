//! Common types and contracts shared by all equipment variants.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};

use crate::error::ActuatorError;

/// Instantaneous draw of an equipment.
///
/// `Unknown` is only ever held by equipment whose consumption is not metered
/// while it is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    Watts(i64),
    Unknown,
}

impl Power {
    /// Returns the draw in watts, or `None` when it is not metered.
    pub fn watts(self) -> Option<i64> {
        match self {
            Self::Watts(w) => Some(w),
            Self::Unknown => None,
        }
    }

    /// True for exactly zero watts; unknown power counts as on.
    pub fn is_off(self) -> bool {
        self == Self::Watts(0)
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watts(w) => write!(f, "{w}W"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Power {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Watts(w) => serializer.serialize_i64(*w),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Result of asking an equipment to shed or absorb power.
///
/// For a decrease, `Known` carries the amount freed. For an increase it carries
/// the leftover that was not absorbed; a negative leftover is the shortfall that
/// kept the equipment from switching on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOutcome {
    Known(i64),
    /// The effect cannot be measured before the next reading.
    Unknown,
}

/// A power change decided by a variant, applied by [`super::Equipment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    /// New power level, `None` when nothing changes.
    pub target: Option<Power>,
    pub outcome: PowerOutcome,
}

impl Adjustment {
    /// No power change.
    pub fn unchanged(outcome: PowerOutcome) -> Self {
        Self {
            target: None,
            outcome,
        }
    }

    /// Power change to `target`.
    pub fn to(target: Power, outcome: PowerOutcome) -> Self {
        Self {
            target: Some(target),
            outcome,
        }
    }
}

/// Control value sent to the hardware driving an equipment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorCommand {
    /// Phase-angle regulator setting, 0 to 100.
    Percent(f64),
    /// Relay state.
    Switch(bool),
}

impl fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{p:.1}%"),
            Self::Switch(true) => f.write_str("on"),
            Self::Switch(false) => f.write_str("off"),
        }
    }
}

/// Destination of actuator commands, one call per power change.
pub trait Actuator {
    /// Delivers `command` to the hardware of equipment `name`.
    ///
    /// # Errors
    ///
    /// Returns an `ActuatorError` when the command could not be delivered.
    fn send(&mut self, name: &str, command: ActuatorCommand) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn send(&mut self, name: &str, command: ActuatorCommand) -> Result<(), ActuatorError> {
        (**self).send(name, command)
    }
}

/// Contextual information passed to equipment on every mutation.
/// # Fields
/// * `now` - Wall-clock time of the mutation, anchors energy integration
/// * `actuator` - Where the resulting control value is sent
pub struct EquipmentContext<'a> {
    pub now: DateTime<FixedOffset>,
    pub actuator: &'a mut dyn Actuator,
}

impl<'a> EquipmentContext<'a> {
    /// Creates a context for mutations happening at `now`.
    ///
    /// # Arguments
    ///
    /// * `now` - Wall-clock time of the mutation
    /// * `actuator` - Receives the commands resulting from the mutation
    pub fn new(now: DateTime<FixedOffset>, actuator: &'a mut dyn Actuator) -> Self {
        Self { now, actuator }
    }
}
