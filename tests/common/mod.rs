//! Shared test fixtures for integration tests.

use std::io;

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};
use solar_regulator::equipment::{Actuator, ActuatorCommand, Equipment, RecordingActuator};
use solar_regulator::error::{ActuatorError, ReportError};
use solar_regulator::regulation::{
    RecordingReporter, RegulationEngine, RegulationParams, StatusReporter, StatusSnapshot,
    TickOutcome,
};

pub type TestEngine = RegulationEngine<RecordingActuator, RecordingReporter>;

/// Default evaluation period.
pub fn period() -> TimeDelta {
    TimeDelta::seconds(5)
}

/// 2024-06-01 at `h:m:s`, UTC.
pub fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("valid offset")
        .with_ymd_and_hms(2024, 6, 1, h, m, s)
        .single()
        .expect("unambiguous time")
}

/// Engine with default thresholds (5 s period, 20 W threshold, 20 W margin), created at 11:00.
pub fn engine(equipments: Vec<Equipment>) -> TestEngine {
    engine_with(equipments, RecordingActuator::default(), RecordingReporter::default())
}

/// Same as [`engine`] with caller-provided collaborators.
pub fn engine_with<A: Actuator, R: StatusReporter>(
    equipments: Vec<Equipment>,
    actuator: A,
    reporter: R,
) -> RegulationEngine<A, R> {
    RegulationEngine::new(
        RegulationParams::default(),
        equipments,
        actuator,
        reporter,
        at(11, 0, 0),
    )
}

/// Records both readings and returns the outcome of the evaluation at `now`.
///
/// Consumption is recorded while the engine is still rate limited (or before
/// any production is known), so only the production reading evaluates.
pub fn evaluate_readings<A: Actuator, R: StatusReporter>(
    engine: &mut RegulationEngine<A, R>,
    consumption_w: i64,
    production_w: i64,
    now: DateTime<FixedOffset>,
) -> Option<TickOutcome> {
    let quiet = engine.last_evaluation().unwrap_or(now - period());
    engine.set_consumption(consumption_w, quiet);
    engine.set_production(production_w, now)
}

/// Current power of `name` in watts, panicking if unknown or absent.
pub fn watts<A: Actuator, R: StatusReporter>(engine: &RegulationEngine<A, R>, name: &str) -> i64 {
    engine
        .equipment(name)
        .and_then(|e| e.current_power().watts())
        .unwrap_or_else(|| panic!("{name} should have a known power"))
}

pub fn last_snapshot(engine: &TestEngine) -> &StatusSnapshot {
    engine.reporter().last().expect("a snapshot should have been published")
}

/// Status sink that rejects the first `failures_left` snapshots.
#[derive(Debug, Default)]
pub struct FlakyReporter {
    pub failures_left: usize,
    pub snapshots: Vec<StatusSnapshot>,
}

impl StatusReporter for FlakyReporter {
    fn report(&mut self, snapshot: &StatusSnapshot) -> Result<(), ReportError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(ReportError::Io(io::Error::other("status sink unavailable")));
        }
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

/// Actuator whose hardware never answers; counts delivery attempts.
#[derive(Debug, Default)]
pub struct UnreachableActuator {
    pub attempts: usize,
}

impl Actuator for UnreachableActuator {
    fn send(&mut self, _name: &str, _command: ActuatorCommand) -> Result<(), ActuatorError> {
        self.attempts += 1;
        Err(ActuatorError::Io(io::Error::other("relay board unreachable")))
    }
}
