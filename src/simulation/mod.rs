//! Synthetic-day driver feeding simulated meter readings to the regulation engine.

/// Household consumption model.
pub mod household;
/// Post-hoc KPI computation.
pub mod kpi;
/// Shared noise and time helpers.
pub mod noise;
/// Solar production model.
pub mod solar;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, RegulatorConfig};
use crate::equipment::RecordingActuator;
use crate::regulation::{RecordingReporter, RegulationEngine, StatusSnapshot};

pub use household::HouseholdLoad;
pub use kpi::SimulationKpis;
pub use solar::SolarProfile;

/// Seed offset for the household RNG to avoid correlation with the solar noise.
const LOAD_SEED_OFFSET: u64 = 57;

/// Simulation owning the profiles and an engine wired to in-memory collaborators.
///
/// Each step reads production at the step timestamp, then consumption one
/// evaluation period later. Consumption includes the draw of the regulated
/// equipment as left by the production tick, so decisions feed back into
/// the next reading.
pub struct Simulation {
    engine: RegulationEngine<RecordingActuator, RecordingReporter>,
    solar: SolarProfile,
    household: HouseholdLoad,
    start: DateTime<FixedOffset>,
    step: TimeDelta,
    steps: u64,
}

/// Everything a finished simulation produced.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub snapshots: Vec<StatusSnapshot>,
    /// Actuator commands in emission order, with the target equipment name.
    pub commands: RecordingActuator,
    pub kpis: SimulationKpis,
}

impl Simulation {
    /// Builds a simulation from a configuration.
    ///
    /// # Errors
    ///
    /// Returns every validation error of `config`.
    pub fn from_config(config: &RegulatorConfig) -> Result<Self, Vec<ConfigError>> {
        let s = &config.simulation;
        let start = s.start_date.and_time(NaiveTime::MIN).and_utc().fixed_offset();
        let engine = RegulationEngine::from_config(
            config,
            RecordingActuator::default(),
            RecordingReporter::default(),
            start,
        )?;

        Ok(Self {
            engine,
            solar: SolarProfile::new(
                s.solar_peak_w,
                s.sunrise_hour,
                s.sunset_hour,
                s.solar_noise_std,
                s.seed,
            ),
            household: HouseholdLoad::new(
                s.base_load_w,
                s.load_amplitude_w,
                s.load_noise_std,
                s.seed.wrapping_add(LOAD_SEED_OFFSET),
            ),
            start,
            step: s.step(),
            steps: u64::from(s.days) * 86_400 / s.step_secs.max(1),
        })
    }

    /// Executes step `i`. A step whose timestamp is out of range is skipped.
    pub fn step(&mut self, i: u64) {
        let t = i32::try_from(i)
            .ok()
            .and_then(|i| self.step.checked_mul(i))
            .and_then(|offset| self.start.checked_add_signed(offset));
        let Some(t) = t else {
            warn!(step = i, "step timestamp out of range, skipping");
            return;
        };
        let production_w = self.solar.production_w(t);
        self.engine.set_production(production_w, t);

        let draw_w: i64 = self
            .engine
            .equipments()
            .iter()
            .filter_map(|e| e.current_power().watts())
            .sum();
        let consumption_w = self.household.demand_w(t) + draw_w;
        let t_consumption = t + self.engine.params().evaluation_period;
        let outcome = self.engine.set_consumption(consumption_w, t_consumption);
        debug!(step = i, production_w, consumption_w, ?outcome, "simulated step");
    }

    /// Runs every step and summarises the recorded snapshots.
    pub fn run(mut self) -> SimulationRun {
        info!(steps = self.steps, start = %self.start, "starting simulation");
        for i in 0..self.steps {
            self.step(i);
        }

        let (commands, reporter) = self.engine.into_parts();
        let kpis = SimulationKpis::from_snapshots(&reporter.snapshots);
        info!(
            snapshots = reporter.snapshots.len(),
            commands = commands.commands.len(),
            "simulation finished"
        );
        SimulationRun {
            snapshots: reporter.snapshots,
            commands,
            kpis,
        }
    }

    /// The engine being driven.
    pub fn engine(&self) -> &RegulationEngine<RecordingActuator, RecordingReporter> {
        &self.engine
    }

    /// Number of steps `run` executes.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}
