//! Priority-ordered allocation of surplus solar power across controllable loads.

pub mod config;
/// Controllable loads: power control, forcing, and energy accounting.
pub mod equipment;
pub mod error;
/// Inbound line adapter.
pub mod ingest;
pub mod io;
pub mod logging;
pub mod regulation;
pub mod runtime;
/// Synthetic-day driver and KPI summary.
pub mod simulation;
