//! Status snapshot published after every completed evaluation.

use std::fmt;
use std::io::Write;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::equipment::{Equipment, Power};
use crate::error::ReportError;

/// Per-equipment part of a [`StatusSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentStatus {
    pub name: String,
    /// Watts, or `"unknown"` once serialized.
    pub current_power: Power,
    /// Energy accumulated today (Wh).
    #[serde(rename = "energy")]
    pub energy_wh: f64,
    pub forced: bool,
}

impl From<&Equipment> for EquipmentStatus {
    fn from(equipment: &Equipment) -> Self {
        Self {
            name: equipment.name().to_string(),
            current_power: equipment.current_power(),
            energy_wh: equipment.energy_wh(),
            forced: equipment.is_forced(),
        }
    }
}

/// Regulation state at the end of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<FixedOffset>,
    #[serde(rename = "consumption")]
    pub consumption_w: i64,
    #[serde(rename = "production")]
    pub production_w: i64,
    pub equipments: Vec<EquipmentStatus>,
}

impl StatusSnapshot {
    /// Status of the equipment called `name`.
    pub fn equipment(&self, name: &str) -> Option<&EquipmentStatus> {
        self.equipments.iter().find(|e| e.name == name)
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | consumption={:>5} W  production={:>5} W |",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.consumption_w,
            self.production_w,
        )?;
        for e in &self.equipments {
            write!(
                f,
                " {}={}{} ({:.0} Wh)",
                e.name,
                e.current_power,
                if e.forced { "*" } else { "" },
                e.energy_wh,
            )?;
        }
        Ok(())
    }
}

/// Destination of status snapshots.
pub trait StatusReporter {
    /// Publishes one snapshot.
    ///
    /// # Errors
    ///
    /// Returns a `ReportError` when the snapshot could not be written.
    fn report(&mut self, snapshot: &StatusSnapshot) -> Result<(), ReportError>;
}

/// Writes each snapshot as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesReporter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesReporter<W> {
    /// Creates a reporter writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StatusReporter for JsonLinesReporter<W> {
    fn report(&mut self, snapshot: &StatusSnapshot) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub snapshots: Vec<StatusSnapshot>,
}

impl RecordingReporter {
    /// Most recent snapshot, if any.
    pub fn last(&self) -> Option<&StatusSnapshot> {
        self.snapshots.last()
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&mut self, snapshot: &StatusSnapshot) -> Result<(), ReportError> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}
