//! CSV export for recorded status snapshots.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::ReportError;
use crate::regulation::StatusSnapshot;

/// Column header for CSV telemetry export.
const HEADER: &str = "timestamp,consumption_w,production_w,equipment,power_w,energy_wh,forced";

/// Exports snapshots to a CSV file at the given path.
///
/// Writes a header row followed by one row per equipment per snapshot.
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns a `ReportError` if file creation or writing fails.
pub fn export_csv(snapshots: &[StatusSnapshot], path: &Path) -> Result<(), ReportError> {
    let file = File::create(path)?;
    write_csv(snapshots, io::BufWriter::new(file))
}

/// Writes snapshots as CSV to any writer.
///
/// # Errors
///
/// Returns a `ReportError` if writing fails.
pub fn write_csv(snapshots: &[StatusSnapshot], writer: impl Write) -> Result<(), ReportError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    for s in snapshots {
        let timestamp = s.timestamp.to_rfc3339();
        for e in &s.equipments {
            wtr.write_record(&[
                timestamp.clone(),
                s.consumption_w.to_string(),
                s.production_w.to_string(),
                e.name.clone(),
                e.current_power
                    .watts()
                    .map_or_else(|| "unknown".to_string(), |w| w.to_string()),
                format!("{:.3}", e.energy_wh),
                e.forced.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
