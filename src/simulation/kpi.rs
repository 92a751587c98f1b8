//! Post-hoc KPI computation from recorded status snapshots.

use std::fmt;

use crate::regulation::StatusSnapshot;

/// Aggregate indicators of a simulated run.
///
/// Each snapshot's readings are held until the next snapshot, so the last
/// snapshot contributes nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationKpis {
    /// Simulated time covered by the snapshots (h).
    pub duration_h: f64,
    /// Total production (kWh).
    pub production_kwh: f64,
    /// Total metered consumption (kWh).
    pub consumption_kwh: f64,
    /// Energy drawn from the grid (kWh).
    pub grid_import_kwh: f64,
    /// Energy sent back to the grid (kWh).
    pub grid_export_kwh: f64,
    /// Share of production consumed on site (%).
    pub self_consumption_pct: f64,
    /// Energy delivered to each equipment, in priority order (kWh).
    pub diverted_kwh: Vec<(String, f64)>,
}

impl SimulationKpis {
    /// Summarises a run, holding each snapshot until the next one.
    ///
    /// Fewer than two snapshots yield all-zero totals.
    pub fn from_snapshots(snapshots: &[StatusSnapshot]) -> Self {
        let mut kpis = Self {
            duration_h: 0.0,
            production_kwh: 0.0,
            consumption_kwh: 0.0,
            grid_import_kwh: 0.0,
            grid_export_kwh: 0.0,
            self_consumption_pct: 0.0,
            diverted_kwh: snapshots
                .first()
                .map(|s| s.equipments.iter().map(|e| (e.name.clone(), 0.0)).collect())
                .unwrap_or_default(),
        };

        for pair in snapshots.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let dt_h = (b.timestamp - a.timestamp).num_milliseconds() as f64 / 3_600_000.0;
            let kwh = |w: i64| w as f64 * dt_h / 1000.0;

            kpis.duration_h += dt_h;
            kpis.production_kwh += kwh(a.production_w);
            kpis.consumption_kwh += kwh(a.consumption_w);
            kpis.grid_import_kwh += kwh(a.consumption_w.saturating_sub(a.production_w).max(0));
            kpis.grid_export_kwh += kwh(a.production_w.saturating_sub(a.consumption_w).max(0));

            for (slot, e) in kpis.diverted_kwh.iter_mut().zip(&a.equipments) {
                if let Some(w) = e.current_power.watts() {
                    slot.1 += kwh(w);
                }
            }
        }

        if kpis.production_kwh > 0.0 {
            kpis.self_consumption_pct =
                100.0 * (kpis.production_kwh - kpis.grid_export_kwh) / kpis.production_kwh;
        }
        kpis
    }
}

impl fmt::Display for SimulationKpis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Simulated time:        {:.1} h", self.duration_h)?;
        writeln!(f, "Production:            {:.2} kWh", self.production_kwh)?;
        writeln!(f, "Consumption:           {:.2} kWh", self.consumption_kwh)?;
        writeln!(f, "Grid import:           {:.2} kWh", self.grid_import_kwh)?;
        writeln!(f, "Grid export:           {:.2} kWh", self.grid_export_kwh)?;
        writeln!(f, "Self-consumption:      {:.1}%", self.self_consumption_pct)?;
        for (name, kwh) in &self.diverted_kwh {
            writeln!(f, "Diverted to {name:<10} {kwh:.2} kWh")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::Power;
    use crate::regulation::EquipmentStatus;
    use approx::assert_relative_eq;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn at(h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("valid offset")
            .with_ymd_and_hms(2024, 6, 1, h, 0, 0)
            .unwrap()
    }

    fn snap(h: u32, consumption_w: i64, production_w: i64, heater: Power) -> StatusSnapshot {
        StatusSnapshot {
            timestamp: at(h),
            consumption_w,
            production_w,
            equipments: vec![EquipmentStatus {
                name: "water_heater".to_string(),
                current_power: heater,
                energy_wh: 0.0,
                forced: false,
            }],
        }
    }

    #[test]
    fn empty_snapshots_give_zero_report() {
        let kpis = SimulationKpis::from_snapshots(&[]);
        assert_eq!(kpis.duration_h, 0.0);
        assert!(kpis.diverted_kwh.is_empty());
    }

    #[test]
    fn energies_are_held_until_next_snapshot() {
        let snapshots = vec![
            snap(10, 1000, 3000, Power::Watts(600)),
            snap(11, 2500, 2000, Power::Unknown),
            snap(12, 0, 0, Power::Watts(0)),
        ];
        let kpis = SimulationKpis::from_snapshots(&snapshots);
        assert_relative_eq!(kpis.duration_h, 2.0);
        assert_relative_eq!(kpis.production_kwh, 5.0);
        assert_relative_eq!(kpis.consumption_kwh, 3.5);
        assert_relative_eq!(kpis.grid_export_kwh, 2.0);
        assert_relative_eq!(kpis.grid_import_kwh, 0.5);
        assert_relative_eq!(kpis.self_consumption_pct, 60.0);
        assert_relative_eq!(kpis.diverted_kwh[0].1, 0.6);
    }

    #[test]
    fn display_lists_equipment() {
        let kpis = SimulationKpis::from_snapshots(&[snap(10, 0, 0, Power::Watts(0))]);
        assert!(format!("{kpis}").contains("water_heater"));
    }
}
