//! Manual control requests addressed to one equipment by name.

use chrono::TimeDelta;
use serde::Deserialize;

/// A force or unforce request, as received on the control channel.
///
/// ```
/// use solar_regulator::regulation::command::Command;
///
/// let cmd = Command::from_json(r#"{"command":"force","name":"water_heater","power":2400,"duration":3600}"#).unwrap();
/// assert_eq!(cmd.name(), "water_heater");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Force {
        name: String,
        /// Requested power in watts.
        power: i64,
        /// Seconds before the forcing lapses; absent or 0 means no limit.
        #[serde(default)]
        duration: Option<u64>,
    },
    Unforce {
        name: String,
    },
}

impl Command {
    /// Parses a control payload.
    ///
    /// # Errors
    ///
    /// Returns the decoding error for malformed payloads or unsupported commands.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Name of the targeted equipment.
    pub fn name(&self) -> &str {
        match self {
            Self::Force { name, .. } | Self::Unforce { name } => name,
        }
    }

    /// Power to force to, `None` for an unforce.
    pub fn power(&self) -> Option<i64> {
        match self {
            Self::Force { power, .. } => Some(*power),
            Self::Unforce { .. } => None,
        }
    }

    /// Forcing duration of a `Force` command; `None` when absent, zero or out of range.
    pub fn duration(&self) -> Option<TimeDelta> {
        match self {
            Self::Force {
                duration: Some(secs),
                ..
            } if *secs > 0 => i64::try_from(*secs).ok().and_then(TimeDelta::try_seconds),
            _ => None,
        }
    }
}
