//! Regulation engine: matches consumption to production by adjusting equipment power.

use chrono::{DateTime, FixedOffset, TimeDelta};
use tracing::{debug, error, info};

use crate::config::{ConfigError, RegulatorConfig};
use crate::equipment::{Actuator, Equipment, EquipmentContext, Power, PowerOutcome};
use crate::error::RegulationError;

use super::command::Command;
use super::fallback::{FallbackParams, LowEnergyFallback};
use super::status::{EquipmentStatus, StatusReporter, StatusSnapshot};

/// Thresholds of the evaluation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegulationParams {
    /// Minimum time between two evaluations.
    pub evaluation_period: TimeDelta,
    /// Surplus below which production and consumption count as balanced (W).
    pub balance_threshold_w: i64,
    /// Production kept back from allocation to absorb measurement error (W).
    pub margin_w: i64,
}

impl Default for RegulationParams {
    fn default() -> Self {
        Self {
            evaluation_period: TimeDelta::seconds(5),
            balance_threshold_w: 20,
            margin_w: 20,
        }
    }
}

/// Direction chosen by one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Consumption exceeds production, shed `excess_w`.
    Decrease { excess_w: i64 },
    Balanced,
    /// Production exceeds consumption, allocate `available_w`.
    Increase { available_w: i64 },
}

impl Mode {
    /// Classifies the surplus `gap = production - margin - consumption`.
    pub fn from_gap(gap_w: i64, balance_threshold_w: i64) -> Self {
        if gap_w < 0 {
            Self::Decrease {
                excess_w: gap_w.saturating_neg(),
            }
        } else if gap_w < balance_threshold_w {
            Self::Balanced
        } else {
            Self::Increase { available_w: gap_w }
        }
    }
}

/// What an evaluation request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Too soon after the previous evaluation; nothing happened.
    RateLimited,
    /// Housekeeping ran, but a reading is still missing.
    AwaitingReadings,
    /// Equipment was adjusted (or left balanced) and a snapshot was published.
    Completed(Mode),
}

/// Regulation context: the priority-ordered equipment list, the latest readings
/// and the collaborators receiving actuator commands and status snapshots.
///
/// Equipment order is fixed at construction; index 0 has the highest priority.
/// All methods take the current time explicitly.
pub struct RegulationEngine<A: Actuator, R: StatusReporter> {
    params: RegulationParams,
    equipments: Vec<Equipment>,
    fallback: Option<LowEnergyFallback>,
    consumption_w: Option<i64>,
    production_w: Option<i64>,
    last_evaluation: Option<DateTime<FixedOffset>>,
    actuator: A,
    reporter: R,
}

impl<A: Actuator, R: StatusReporter> RegulationEngine<A, R> {
    /// Creates an engine and switches every equipment off at `now`.
    pub fn new(
        params: RegulationParams,
        equipments: Vec<Equipment>,
        actuator: A,
        reporter: R,
        now: DateTime<FixedOffset>,
    ) -> Self {
        let mut engine = Self {
            params,
            equipments,
            fallback: None,
            consumption_w: None,
            production_w: None,
            last_evaluation: None,
            actuator,
            reporter,
        };

        let mut ctx = EquipmentContext::new(now, &mut engine.actuator);
        for equipment in &mut engine.equipments {
            equipment.set_current_power(Power::Watts(0), &mut ctx);
        }
        engine
    }

    /// Attaches the low-energy fallback to the variable equipment called `name`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if no variable-power equipment has that name.
    pub fn with_fallback(mut self, name: &str, params: FallbackParams) -> Result<Self, ConfigError> {
        let index = self
            .equipments
            .iter()
            .position(|e| e.name() == name && e.max_power_w().is_some())
            .ok_or_else(|| ConfigError {
                field: "fallback.equipment".to_string(),
                message: format!("no variable-power equipment named \"{name}\""),
            })?;
        self.fallback = Some(LowEnergyFallback::new(index, params));
        Ok(self)
    }

    /// Builds the engine described by a configuration.
    ///
    /// # Errors
    ///
    /// Returns every validation error of `config`.
    pub fn from_config(
        config: &RegulatorConfig,
        actuator: A,
        reporter: R,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, Vec<ConfigError>> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let engine = Self::new(
            config.regulation.params(),
            config.build_equipments(),
            actuator,
            reporter,
            now,
        );
        if config.fallback.enabled {
            engine
                .with_fallback(&config.fallback.equipment, config.fallback.params())
                .map_err(|e| vec![e])
        } else {
            Ok(engine)
        }
    }

    /// Records a consumption reading and requests an evaluation.
    pub fn set_consumption(&mut self, watts: i64, now: DateTime<FixedOffset>) -> Option<TickOutcome> {
        self.consumption_w = Some(watts);
        self.tick(now)
    }

    /// Records a production reading and requests an evaluation.
    pub fn set_production(&mut self, watts: i64, now: DateTime<FixedOffset>) -> Option<TickOutcome> {
        self.production_w = Some(watts);
        self.tick(now)
    }

    /// Applies a force or unforce request, then requests an evaluation.
    ///
    /// Requests naming no known equipment are ignored and return `None`.
    pub fn apply_command(
        &mut self,
        command: &Command,
        now: DateTime<FixedOffset>,
    ) -> Option<TickOutcome> {
        let Some(equipment) = self.equipments.iter_mut().find(|e| e.name() == command.name())
        else {
            debug!(equipment = command.name(), "ignoring command for unknown equipment");
            return None;
        };

        match command.power() {
            Some(power_w) => info!(
                equipment = command.name(),
                power_w,
                duration_secs = ?command.duration().map(|d| d.num_seconds()),
                "forcing equipment"
            ),
            None => info!(equipment = command.name(), "not forcing equipment anymore"),
        }
        let mut ctx = EquipmentContext::new(now, &mut self.actuator);
        equipment.force(command.power(), command.duration(), &mut ctx);
        self.tick(now)
    }

    /// Runs one guarded evaluation: a fault is logged and only aborts this tick.
    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> Option<TickOutcome> {
        match self.evaluate(now) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, "evaluation aborted");
                None
            }
        }
    }

    /// Runs one evaluation.
    ///
    /// # Errors
    ///
    /// Returns a `RegulationError` when the status snapshot cannot be published.
    /// Equipment changes made before the failure are kept.
    pub fn evaluate(&mut self, now: DateTime<FixedOffset>) -> Result<TickOutcome, RegulationError> {
        if let Some(last) = self.last_evaluation {
            if now - last < self.params.evaluation_period {
                return Ok(TickOutcome::RateLimited);
            }
            if last.date_naive() != now.date_naive() {
                self.roll_over_day(now);
            }
        }

        for equipment in &mut self.equipments {
            equipment.refresh_forced(now);
        }

        if let (Some(fallback), Some(last)) = (self.fallback.as_mut(), self.last_evaluation) {
            let mut ctx = EquipmentContext::new(now, &mut self.actuator);
            let equipment = &mut self.equipments[fallback.equipment_index()];
            fallback.run(equipment, last, &mut ctx);
        }

        self.last_evaluation = Some(now);

        let (Some(consumption_w), Some(production_w)) = (self.consumption_w, self.production_w)
        else {
            return Ok(TickOutcome::AwaitingReadings);
        };

        info!(consumption_w, production_w, "evaluating");
        let mode = Mode::from_gap(
            production_w
                .saturating_sub(self.params.margin_w)
                .saturating_sub(consumption_w),
            self.params.balance_threshold_w,
        );
        match mode {
            Mode::Decrease { excess_w } => {
                info!(excess_w, "decreasing global power consumption");
                self.decrease(excess_w, now);
            }
            Mode::Balanced => info!("power consumption and production are balanced"),
            Mode::Increase { available_w } => {
                info!(available_w, "increasing global power consumption");
                self.increase(available_w, now);
            }
        }

        let snapshot = self.snapshot(now, consumption_w, production_w);
        self.reporter.report(&snapshot)?;
        Ok(TickOutcome::Completed(mode))
    }

    fn roll_over_day(&mut self, now: DateTime<FixedOffset>) {
        for equipment in &mut self.equipments {
            let energy_wh = equipment.reset_energy(now);
            info!(equipment = equipment.name(), energy_wh, "daily energy counter reset");
        }
    }

    /// Sheds `excess_w`, lowest priority first.
    fn decrease(&mut self, mut excess_w: i64, now: DateTime<FixedOffset>) {
        let mut ctx = EquipmentContext::new(now, &mut self.actuator);
        for equipment in self.equipments.iter_mut().rev() {
            if equipment.is_forced() {
                debug!(equipment = equipment.name(), "skipping forced equipment");
                continue;
            }
            match equipment.decrease_power_by(excess_w, &mut ctx) {
                PowerOutcome::Unknown => {
                    debug!("waiting for the next measurement to see the effect");
                    return;
                }
                PowerOutcome::Known(freed_w) => {
                    excess_w = excess_w.saturating_sub(freed_w);
                    if excess_w <= 0 {
                        debug!("no more excess power consumption");
                        return;
                    }
                    debug!(excess_w, "excess power left to cancel");
                }
            }
        }
        debug!(excess_w, "no more equipment to check");
    }

    /// Allocates `available_w`, highest priority first, recovering power from
    /// lower-priority equipment when a higher-priority one falls short.
    fn increase(&mut self, mut available_w: i64, now: DateTime<FixedOffset>) {
        let mut ctx = EquipmentContext::new(now, &mut self.actuator);
        let equipments = &mut self.equipments;

        for i in 0..equipments.len() {
            if available_w <= 0 {
                debug!("no more available power");
                return;
            }
            if equipments[i].is_forced() {
                debug!(equipment = equipments[i].name(), "skipping forced equipment");
                continue;
            }

            match equipments[i].increase_power_by(available_w, &mut ctx) {
                PowerOutcome::Unknown => {
                    debug!("waiting for the next measurement to see the effect");
                    return;
                }
                PowerOutcome::Known(0) => {
                    debug!("no more available power to use");
                    return;
                }
                PowerOutcome::Known(leftover_w) if leftover_w > 0 => {
                    available_w = leftover_w;
                    debug!(available_w, "power left to use");
                }
                PowerOutcome::Known(shortfall) => {
                    let needed_w = -shortfall;
                    let (head, lower) = equipments.split_at_mut(i + 1);
                    let freeable_w: i64 = lower
                        .iter()
                        .filter(|e| !e.is_forced())
                        .filter_map(|e| e.current_power().watts())
                        .fold(0, i64::saturating_add);
                    debug!(
                        equipment = head[i].name(),
                        freeable_w, needed_w, "trying to recover power on lower priority equipment"
                    );
                    if freeable_w < needed_w {
                        debug!("not enough power on lower priority equipment");
                        continue;
                    }

                    let Some(freed_w) = shed(lower, needed_w, &mut ctx) else {
                        debug!("waiting for the next measurement to see the effect");
                        return;
                    };
                    match head[i].increase_power_by(available_w.saturating_add(freed_w), &mut ctx) {
                        PowerOutcome::Unknown => return,
                        PowerOutcome::Known(leftover_w) => available_w = leftover_w,
                    }
                }
            }
        }
        debug!(available_w, "no more equipment to check");
    }

    /// Builds the snapshot of the current state.
    pub fn snapshot(
        &self,
        now: DateTime<FixedOffset>,
        consumption_w: i64,
        production_w: i64,
    ) -> StatusSnapshot {
        StatusSnapshot {
            timestamp: now,
            consumption_w,
            production_w,
            equipments: self.equipments.iter().map(EquipmentStatus::from).collect(),
        }
    }

    /// Evaluation period and thresholds in use.
    pub fn params(&self) -> &RegulationParams {
        &self.params
    }

    /// Equipment in priority order.
    pub fn equipments(&self) -> &[Equipment] {
        &self.equipments
    }

    /// Looks up an equipment by name.
    pub fn equipment(&self, name: &str) -> Option<&Equipment> {
        self.equipments.iter().find(|e| e.name() == name)
    }

    /// The low-energy fallback, when one is attached.
    pub fn fallback(&self) -> Option<&LowEnergyFallback> {
        self.fallback.as_ref()
    }

    /// Latest consumption reading (W).
    pub fn consumption_w(&self) -> Option<i64> {
        self.consumption_w
    }

    /// Latest production reading (W).
    pub fn production_w(&self) -> Option<i64> {
        self.production_w
    }

    /// Time of the last tick that was not rate limited.
    pub fn last_evaluation(&self) -> Option<DateTime<FixedOffset>> {
        self.last_evaluation
    }

    /// Where actuator commands go.
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Where status snapshots go.
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Consumes the engine and returns its actuator and reporter.
    pub fn into_parts(self) -> (A, R) {
        (self.actuator, self.reporter)
    }
}

/// Sheds up to `needed_w` from `equipments`, last first; `None` if an effect is unknown.
fn shed(equipments: &mut [Equipment], mut needed_w: i64, ctx: &mut EquipmentContext<'_>) -> Option<i64> {
    let mut freed_w = 0;
    for equipment in equipments.iter_mut().rev() {
        if equipment.is_forced() {
            continue;
        }
        match equipment.decrease_power_by(needed_w, ctx) {
            PowerOutcome::Unknown => return None,
            PowerOutcome::Known(w) => {
                freed_w += w;
                needed_w -= w;
                if needed_w <= 0 {
                    debug!("enough power has been recovered");
                    break;
                }
            }
        }
    }
    Some(freed_w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::RecordingActuator;
    use crate::regulation::status::RecordingReporter;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("valid offset")
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .unwrap()
            + TimeDelta::seconds(secs)
    }

    fn engine(equipments: Vec<Equipment>) -> RegulationEngine<RecordingActuator, RecordingReporter> {
        RegulationEngine::new(
            RegulationParams::default(),
            equipments,
            RecordingActuator::default(),
            RecordingReporter::default(),
            at(0),
        )
    }

    #[test]
    fn mode_classifies_gap() {
        assert_eq!(Mode::from_gap(-5, 20), Mode::Decrease { excess_w: 5 });
        assert_eq!(Mode::from_gap(0, 20), Mode::Balanced);
        assert_eq!(Mode::from_gap(19, 20), Mode::Balanced);
        assert_eq!(Mode::from_gap(20, 20), Mode::Increase { available_w: 20 });
        assert_eq!(
            Mode::from_gap(i64::MIN, 20),
            Mode::Decrease { excess_w: i64::MAX }
        );
    }

    #[test]
    fn construction_switches_everything_off() {
        let e = engine(vec![Equipment::constant("a", 100), Equipment::variable("b", 1000)]);
        assert_eq!(e.actuator().commands.len(), 2);
        assert!(e.equipments().iter().all(|e| e.current_power() == Power::Watts(0)));
    }

    #[test]
    fn readings_missing_still_records_tick() {
        let mut e = engine(vec![Equipment::variable("b", 1000)]);
        assert_eq!(e.set_consumption(100, at(10)), Some(TickOutcome::AwaitingReadings));
        assert_eq!(e.last_evaluation(), Some(at(10)));
        assert!(e.reporter().snapshots.is_empty());
    }

    #[test]
    fn rate_limit_skips_close_ticks() {
        let mut e = engine(vec![Equipment::variable("b", 1000)]);
        e.set_consumption(0, at(0));
        assert_eq!(e.set_production(500, at(4)), Some(TickOutcome::RateLimited));
        assert_eq!(
            e.set_production(500, at(5)),
            Some(TickOutcome::Completed(Mode::Increase { available_w: 480 }))
        );
    }

    #[test]
    fn unknown_command_target_is_ignored() {
        let mut e = engine(vec![Equipment::variable("b", 1000)]);
        let cmd = Command::Unforce {
            name: "nope".to_string(),
        };
        assert_eq!(e.apply_command(&cmd, at(10)), None);
        assert_eq!(e.last_evaluation(), None);
    }

    #[test]
    fn fallback_requires_variable_equipment() {
        let e = engine(vec![Equipment::constant("a", 100)]);
        assert!(e.with_fallback("a", FallbackParams::default()).is_err());
    }
}
