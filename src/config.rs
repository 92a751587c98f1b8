//! TOML-based regulator configuration and preset definitions.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, TimeDelta};
use serde::Deserialize;

use crate::equipment::variable::{MINIMUM_PERCENT, MINIMUM_POWER_W};
use crate::equipment::{ConstantPower, Equipment, EquipmentKind, UnknownPower, VariablePower};
use crate::regulation::{FallbackParams, RegulationParams};

/// Top-level configuration parsed from TOML.
///
/// All sections have defaults matching the reference deployment. Load from
/// TOML with [`RegulatorConfig::from_toml_file`] or use
/// [`RegulatorConfig::reference`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegulatorConfig {
    /// Evaluation timing and thresholds.
    #[serde(default)]
    pub regulation: RegulationConfig,
    /// Regulated equipment, highest priority first.
    #[serde(default = "reference_equipment")]
    pub equipment: Vec<EquipmentConfig>,
    /// Low-energy fallback.
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Synthetic day used by the `simulate` command.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Evaluation timing and thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegulationConfig {
    /// Minimum seconds between two evaluations (must be > 0).
    pub evaluation_period_secs: u64,
    /// Surplus below which the system counts as balanced (W).
    pub balance_threshold_w: i64,
    /// Production held back from allocation (W).
    pub margin_w: i64,
    /// Seconds without inbound events before the live loop ticks anyway (must be > 0).
    pub idle_timeout_secs: u64,
}

impl Default for RegulationConfig {
    fn default() -> Self {
        Self {
            evaluation_period_secs: 5,
            balance_threshold_w: 20,
            margin_w: 20,
            idle_timeout_secs: 60,
        }
    }
}

impl RegulationConfig {
    /// Engine parameters described by this section.
    pub fn params(&self) -> RegulationParams {
        RegulationParams {
            evaluation_period: seconds(self.evaluation_period_secs),
            balance_threshold_w: self.balance_threshold_w,
            margin_w: self.margin_w,
        }
    }

    /// How long the live loop waits for an event before ticking anyway.
    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_timeout_secs)
    }
}

fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

fn default_minimum_power_w() -> i64 {
    MINIMUM_POWER_W
}

fn default_minimum_percent() -> f64 {
    MINIMUM_PERCENT
}

/// One regulated equipment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum EquipmentConfig {
    /// Continuously regulated load.
    Variable {
        name: String,
        /// Full-load draw (W).
        max_power_w: i64,
        /// Lowest draw the actuator holds reliably (W).
        #[serde(default = "default_minimum_power_w")]
        minimum_power_w: i64,
        /// Lowest actuator percent for a non-zero draw.
        #[serde(default = "default_minimum_percent")]
        minimum_percent: f64,
    },
    /// On/off load with a known draw.
    Constant { name: String, nominal_power_w: i64 },
    /// On/off load without metering.
    Unknown { name: String },
}

impl EquipmentConfig {
    /// Configured equipment name.
    pub fn name(&self) -> &str {
        match self {
            Self::Variable { name, .. } | Self::Constant { name, .. } | Self::Unknown { name } => {
                name
            }
        }
    }

    /// Variant model with its configured bounds.
    pub fn kind(&self) -> EquipmentKind {
        match *self {
            Self::Variable {
                max_power_w,
                minimum_power_w,
                minimum_percent,
                ..
            } => EquipmentKind::Variable(VariablePower::with_floor(
                max_power_w,
                minimum_power_w,
                minimum_percent,
            )),
            Self::Constant {
                nominal_power_w, ..
            } => EquipmentKind::Constant(ConstantPower::new(nominal_power_w)),
            Self::Unknown { .. } => EquipmentKind::Unknown(UnknownPower),
        }
    }

    /// Builds the idle equipment.
    pub fn build(&self) -> Equipment {
        Equipment::new(self.name(), self.kind())
    }
}

fn reference_equipment() -> Vec<EquipmentConfig> {
    vec![
        EquipmentConfig::Constant {
            name: "e_bike_charger".to_string(),
            nominal_power_w: 120,
        },
        EquipmentConfig::Variable {
            name: "water_heater".to_string(),
            max_power_w: 2400,
            minimum_power_w: MINIMUM_POWER_W,
            minimum_percent: MINIMUM_PERCENT,
        },
    ]
}

/// Low-energy fallback parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    pub enabled: bool,
    /// Name of the variable equipment topped up from the grid.
    pub equipment: String,
    /// Hour (0-23) at which the energy floors are checked.
    pub check_hour: u32,
    /// Hour (0-23) at which today's energy is kept for tomorrow's check.
    pub snapshot_hour: u32,
    /// Minimum energy over yesterday and today (Wh).
    pub two_day_floor_wh: f64,
    /// Minimum energy today (Wh).
    pub one_day_floor_wh: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        let p = FallbackParams::default();
        Self {
            enabled: true,
            equipment: "water_heater".to_string(),
            check_hour: p.check_hour,
            snapshot_hour: p.snapshot_hour,
            two_day_floor_wh: p.two_day_floor_wh,
            one_day_floor_wh: p.one_day_floor_wh,
        }
    }
}

impl FallbackConfig {
    /// Fallback parameters described by this section.
    pub fn params(&self) -> FallbackParams {
        FallbackParams {
            check_hour: self.check_hour,
            snapshot_hour: self.snapshot_hour,
            two_day_floor_wh: self.two_day_floor_wh,
            one_day_floor_wh: self.one_day_floor_wh,
        }
    }
}

/// Synthetic day parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed.
    pub seed: u64,
    /// First simulated day (UTC), as `"YYYY-MM-DD"`.
    pub start_date: NaiveDate,
    /// Seconds between two simulated meter readings.
    pub step_secs: u64,
    /// Number of days to simulate (must be > 0).
    pub days: u32,
    /// Peak solar production (W).
    pub solar_peak_w: f64,
    /// Sunrise, as a fractional hour.
    pub sunrise_hour: f64,
    /// Sunset, as a fractional hour.
    pub sunset_hour: f64,
    /// Multiplicative noise standard deviation on solar output.
    pub solar_noise_std: f64,
    /// Mean household consumption outside regulated equipment (W).
    pub base_load_w: f64,
    /// Daily sinusoid amplitude of the household consumption (W).
    pub load_amplitude_w: f64,
    /// Additive noise standard deviation on household consumption (W).
    pub load_noise_std: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default(),
            step_secs: 60,
            days: 1,
            solar_peak_w: 3000.0,
            sunrise_hour: 6.0,
            sunset_hour: 21.0,
            solar_noise_std: 0.05,
            base_load_w: 350.0,
            load_amplitude_w: 150.0,
            load_noise_std: 30.0,
        }
    }
}

impl SimulationConfig {
    /// Simulated time between two steps.
    pub fn step(&self) -> TimeDelta {
        seconds(self.step_secs)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"regulation.margin_w"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl RegulatorConfig {
    /// Returns the reference deployment: an e-bike charger before a water heater.
    pub fn reference() -> Self {
        Self {
            regulation: RegulationConfig::default(),
            equipment: reference_equipment(),
            fallback: FallbackConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }

    /// Returns the cloudy preset: weak, noisy production so the fallback fires.
    pub fn cloudy() -> Self {
        Self {
            simulation: SimulationConfig {
                solar_peak_w: 700.0,
                solar_noise_std: 0.3,
                ..SimulationConfig::default()
            },
            ..Self::reference()
        }
    }

    /// Returns the heater preset: reference plus a lower-priority 1800 W heater.
    pub fn heater() -> Self {
        let mut equipment = reference_equipment();
        equipment.push(EquipmentConfig::Constant {
            name: "heater".to_string(),
            nominal_power_w: 1800,
        });
        Self {
            equipment,
            simulation: SimulationConfig {
                solar_peak_w: 5000.0,
                ..SimulationConfig::default()
            },
            ..Self::reference()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["reference", "cloudy", "heater"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "reference" => Ok(Self::reference()),
            "cloudy" => Ok(Self::cloudy()),
            "heater" => Ok(Self::heater()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Equipment instances in priority order.
    pub fn build_equipments(&self) -> Vec<Equipment> {
        self.equipment.iter().map(EquipmentConfig::build).collect()
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let r = &self.regulation;
        if r.evaluation_period_secs == 0 {
            errors.push(ConfigError::new("regulation.evaluation_period_secs", "must be > 0"));
        }
        if r.balance_threshold_w < 0 {
            errors.push(ConfigError::new("regulation.balance_threshold_w", "must be >= 0"));
        }
        if r.margin_w < 0 {
            errors.push(ConfigError::new("regulation.margin_w", "must be >= 0"));
        }
        if r.idle_timeout_secs == 0 {
            errors.push(ConfigError::new("regulation.idle_timeout_secs", "must be > 0"));
        }

        self.validate_equipment(&mut errors);
        self.validate_fallback(&mut errors);

        let s = &self.simulation;
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        if s.step_secs < 2 * r.evaluation_period_secs.max(1) {
            errors.push(ConfigError::new(
                "simulation.step_secs",
                "must be at least twice regulation.evaluation_period_secs",
            ));
        }
        if !(0.0..=24.0).contains(&s.sunrise_hour) || !(0.0..=24.0).contains(&s.sunset_hour) {
            errors.push(ConfigError::new("simulation.sunrise_hour", "hours must be in [0, 24]"));
        }
        if s.sunrise_hour >= s.sunset_hour {
            errors.push(ConfigError::new(
                "simulation.sunrise_hour",
                "must be < simulation.sunset_hour",
            ));
        }
        if s.solar_peak_w < 0.0 {
            errors.push(ConfigError::new("simulation.solar_peak_w", "must be >= 0"));
        }
        if s.base_load_w < 0.0 {
            errors.push(ConfigError::new("simulation.base_load_w", "must be >= 0"));
        }
        if s.solar_noise_std < 0.0 || s.load_noise_std < 0.0 {
            errors.push(ConfigError::new(
                "simulation.solar_noise_std",
                "noise standard deviations must be >= 0",
            ));
        }

        errors
    }

    fn validate_equipment(&self, errors: &mut Vec<ConfigError>) {
        if self.equipment.is_empty() {
            errors.push(ConfigError::new("equipment", "at least one equipment is required"));
        }

        let mut names = HashSet::new();
        for (i, e) in self.equipment.iter().enumerate() {
            let field = |name: &str| format!("equipment[{i}].{name}");
            if e.name().is_empty() {
                errors.push(ConfigError::new(field("name"), "must not be empty"));
            } else if !names.insert(e.name()) {
                errors.push(ConfigError::new(
                    field("name"),
                    format!("duplicate equipment name \"{}\"", e.name()),
                ));
            }

            match *e {
                EquipmentConfig::Variable {
                    max_power_w,
                    minimum_power_w,
                    minimum_percent,
                    ..
                } => {
                    if max_power_w <= 0 {
                        errors.push(ConfigError::new(field("max_power_w"), "must be > 0"));
                    }
                    if minimum_power_w < 0 || minimum_power_w > max_power_w {
                        errors.push(ConfigError::new(
                            field("minimum_power_w"),
                            "must be in [0, max_power_w]",
                        ));
                    }
                    if !(0.0..=100.0).contains(&minimum_percent) {
                        errors.push(ConfigError::new(field("minimum_percent"), "must be in [0, 100]"));
                    }
                }
                EquipmentConfig::Constant {
                    nominal_power_w, ..
                } => {
                    if nominal_power_w <= 0 {
                        errors.push(ConfigError::new(field("nominal_power_w"), "must be > 0"));
                    }
                }
                EquipmentConfig::Unknown { .. } => {}
            }
        }
    }

    fn validate_fallback(&self, errors: &mut Vec<ConfigError>) {
        let f = &self.fallback;
        if f.check_hour > 23 {
            errors.push(ConfigError::new("fallback.check_hour", "must be in 0..=23"));
        }
        if f.snapshot_hour > 23 {
            errors.push(ConfigError::new("fallback.snapshot_hour", "must be in 0..=23"));
        }
        if f.two_day_floor_wh < 0.0 || f.one_day_floor_wh < 0.0 {
            errors.push(ConfigError::new(
                "fallback.one_day_floor_wh",
                "energy floors must be >= 0",
            ));
        }
        if f.enabled {
            let target = self.equipment.iter().find(|e| e.name() == f.equipment);
            if !matches!(target, Some(EquipmentConfig::Variable { .. })) {
                errors.push(ConfigError::new(
                    "fallback.equipment",
                    format!("no variable-power equipment named \"{}\"", f.equipment),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_preset_valid() {
        let cfg = RegulatorConfig::reference();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "reference should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let e = RegulatorConfig::from_preset("nonexistent").unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in RegulatorConfig::PRESETS {
            let cfg = RegulatorConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[regulation]
evaluation_period_secs = 10
balance_threshold_w = 30
margin_w = 50
idle_timeout_secs = 30

[[equipment]]
kind = "variable"
name = "water_heater"
max_power_w = 3000

[[equipment]]
kind = "constant"
name = "pool_pump"
nominal_power_w = 750

[[equipment]]
kind = "unknown"
name = "smart_plug"

[fallback]
check_hour = 15
one_day_floor_wh = 2500.0

[simulation]
seed = 7
start_date = "2024-12-21"
step_secs = 30
"#;
        let cfg = RegulatorConfig::from_toml_str(toml).expect("valid TOML should parse");
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
        assert_eq!(cfg.regulation.params().evaluation_period, TimeDelta::seconds(10));
        assert_eq!(cfg.equipment.len(), 3);
        assert_eq!(
            cfg.equipment[0],
            EquipmentConfig::Variable {
                name: "water_heater".to_string(),
                max_power_w: 3000,
                minimum_power_w: MINIMUM_POWER_W,
                minimum_percent: MINIMUM_PERCENT,
            }
        );
        assert_eq!(cfg.fallback.params().check_hour, 15);
        assert_eq!(cfg.fallback.params().snapshot_hour, 23);
        assert_eq!(
            cfg.simulation.start_date,
            NaiveDate::from_ymd_opt(2024, 12, 21).expect("valid date")
        );
    }

    #[test]
    fn build_keeps_priority_order() {
        let names: Vec<String> = RegulatorConfig::heater()
            .build_equipments()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["e_bike_charger", "water_heater", "heater"]);
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[regulation]
margin_w = 20
bogus_field = true
"#;
        assert!(RegulatorConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_equipment_kind_rejected() {
        let toml = r#"
[[equipment]]
kind = "battery"
name = "b"
"#;
        assert!(RegulatorConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = RegulatorConfig::from_toml_str("[regulation]\nmargin_w = 40\n")
            .expect("valid TOML should parse");
        assert_eq!(cfg.regulation.margin_w, 40);
        assert_eq!(cfg.regulation.balance_threshold_w, 20);
        assert_eq!(cfg.equipment, reference_equipment());
        assert!(cfg.fallback.enabled);
    }

    #[test]
    fn validation_catches_duplicate_names() {
        let mut cfg = RegulatorConfig::reference();
        cfg.equipment.push(EquipmentConfig::Unknown {
            name: "water_heater".to_string(),
        });
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "equipment[2].name"));
    }

    #[test]
    fn validation_catches_floor_above_max() {
        let mut cfg = RegulatorConfig::reference();
        cfg.equipment[1] = EquipmentConfig::Variable {
            name: "water_heater".to_string(),
            max_power_w: 100,
            minimum_power_w: 150,
            minimum_percent: 4.0,
        };
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "equipment[1].minimum_power_w"));
    }

    #[test]
    fn validation_requires_variable_fallback_target() {
        let mut cfg = RegulatorConfig::reference();
        cfg.fallback.equipment = "e_bike_charger".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "fallback.equipment"));

        cfg.fallback.enabled = false;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validation_catches_bad_hours_and_periods() {
        let mut cfg = RegulatorConfig::reference();
        cfg.fallback.check_hour = 24;
        cfg.regulation.evaluation_period_secs = 0;
        cfg.simulation.step_secs = 1;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "fallback.check_hour"));
        assert!(errors.iter().any(|e| e.field == "regulation.evaluation_period_secs"));
        assert!(errors.iter().any(|e| e.field == "simulation.step_secs"));
    }

    #[test]
    fn empty_equipment_list_rejected() {
        let mut cfg = RegulatorConfig::reference();
        cfg.equipment.clear();
        cfg.fallback.enabled = false;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "equipment"));
    }
}
