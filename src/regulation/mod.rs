//! Surplus regulation: the evaluation loop and its inputs and outputs.

/// Time sources for the live loop.
pub mod clock;
/// Force and unforce requests.
pub mod command;
pub mod engine;
/// Daily grid top-up of one equipment.
pub mod fallback;
/// Status snapshots and their destinations.
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::Command;
pub use engine::{Mode, RegulationEngine, RegulationParams, TickOutcome};
pub use fallback::{FallbackParams, LowEnergyFallback};
pub use status::{EquipmentStatus, JsonLinesReporter, RecordingReporter, StatusReporter, StatusSnapshot};
