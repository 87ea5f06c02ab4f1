//! Reporting of solved trajectories
//!
//! Trajectories are exported as CSV with one row per reported time. The console summary
//! shows counts in thousands.

use anyhow::{Context, Result};
use csv::Writer;
use rsird_components::{CompartmentState, EpidemicSummary};
use rsird_core::timeseries::{FloatValue, Time};
use rsird_core::trajectory::Trajectory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{create_dir_all, File};
use std::io;
use std::path::Path;

/// A single row of the trajectory report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub time: Time,
    pub susceptible: FloatValue,
    pub infected: FloatValue,
    pub recovered: FloatValue,
    pub deceased: FloatValue,
}

impl TrajectoryRecord {
    pub fn new(time: Time, state: &CompartmentState) -> Self {
        Self {
            time,
            susceptible: state.susceptible,
            infected: state.infected,
            recovered: state.recovered,
            deceased: state.deceased,
        }
    }
}

/// Write a trajectory as CSV with a header row
pub fn write_csv<W: io::Write>(
    writer: W,
    trajectory: &Trajectory<CompartmentState>,
) -> Result<()> {
    let mut writer = Writer::from_writer(writer);
    for (time, state) in trajectory.iter() {
        writer.serialize(TrajectoryRecord::new(time, state))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a trajectory to a CSV file, creating parent directories as needed
pub fn write_csv_file(path: &Path, trajectory: &Trajectory<CompartmentState>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(file, trajectory).with_context(|| format!("Failed to write {}", path.display()))
}

fn thousands(value: FloatValue) -> String {
    format!("{:.1}", value / 1000.0)
}

/// Human readable summary of an epidemic, counts in thousands
pub struct SummaryReport<'a>(pub &'a EpidemicSummary);

impl fmt::Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;

        writeln!(f, "Number (1000s) at t={}", summary.final_time)?;
        for (compartment, value) in summary.final_state.iter() {
            writeln!(f, "  {:<24} {:>10}", compartment.label(), thousands(value))?;
        }
        writeln!(
            f,
            "Peak infected: {} on day {:.1}",
            thousands(summary.peak_infected),
            summary.peak_time
        )?;
        writeln!(f, "Total infected: {}", thousands(summary.total_infected))?;
        write!(
            f,
            "Case fatality ratio: {:.2}%",
            summary.case_fatality * 100.0
        )
    }
}

pub fn format_summary(summary: &EpidemicSummary) -> String {
    SummaryReport(summary).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn trajectory() -> Trajectory<CompartmentState> {
        Trajectory::new(
            vec![0.0, 0.5, 1.0],
            vec![
                CompartmentState::new(990.0, 10.0, 0.0, 0.0),
                CompartmentState::new(985.0, 13.0, 1.5, 0.5),
                CompartmentState::new(979.0, 17.0, 3.0, 1.0),
            ],
        )
    }

    #[test]
    fn csv_layout() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &trajectory()).unwrap();

        let content = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "time,susceptible,infected,recovered,deceased");
        assert_eq!(lines[1], "0.0,990.0,10.0,0.0,0.0");
        assert_eq!(lines[2], "0.5,985.0,13.0,1.5,0.5");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn csv_file_in_new_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("trajectory.csv");
        write_csv_file(&path, &trajectory()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<TrajectoryRecord> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[2],
            TrajectoryRecord::new(1.0, &CompartmentState::new(979.0, 17.0, 3.0, 1.0))
        );
    }

    #[test]
    fn summary_in_thousands() {
        let summary = EpidemicSummary::from_trajectory(&trajectory()).unwrap();
        let text = format_summary(&summary);

        assert!(text.starts_with("Number (1000s) at t=1"));
        assert!(text.contains("Recovered with immunity"));
        assert!(text.contains("Peak infected: 0.0 on day 1.0"));
        assert!(text.contains("Total infected: 0.0"));
        assert!(text.contains("Case fatality ratio: 25.00%"));
    }

    #[test]
    fn summary_lists_every_compartment() {
        let summary = EpidemicSummary::from_trajectory(&trajectory()).unwrap();
        let text = SummaryReport(&summary).to_string();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[1].trim_start().starts_with("Susceptible"));
        assert!(lines[1].ends_with("1.0"));
        assert!(lines[4].trim_start().starts_with("Deceased"));
    }
}
