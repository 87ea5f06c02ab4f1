//! Values derived from a solved SIRD trajectory.

use crate::compartments::{Compartment, CompartmentState};
use ndarray::Array1;
use rsird_core::timeseries::{FloatValue, Time};
use rsird_core::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// Per-compartment access to a SIRD trajectory
pub trait CompartmentColumns {
    /// Values of a single compartment over time
    fn column(&self, compartment: Compartment) -> Array1<FloatValue>;

    /// Sum over all compartments at each time
    fn totals(&self) -> Array1<FloatValue>;
}

impl CompartmentColumns for Trajectory<CompartmentState> {
    fn column(&self, compartment: Compartment) -> Array1<FloatValue> {
        self.states().iter().map(|s| s.get(compartment)).collect()
    }

    fn totals(&self) -> Array1<FloatValue> {
        self.states().iter().map(|s| s.total()).collect()
    }
}

/// Headline numbers of an epidemic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpidemicSummary {
    pub final_time: Time,
    pub final_state: CompartmentState,
    /// Largest number of simultaneously infected individuals
    pub peak_infected: FloatValue,
    /// Index into the trajectory of the infection peak (first occurrence)
    pub peak_index: usize,
    pub peak_time: Time,
    /// Individuals that left the susceptible compartment over the run
    pub total_infected: FloatValue,
    /// Fraction of resolved infections that ended in death, `D / (R + D)`.
    ///
    /// Zero if no infection has been resolved.
    pub case_fatality: FloatValue,
}

impl EpidemicSummary {
    /// Summarise a trajectory, returning `None` if it is empty
    pub fn from_trajectory(trajectory: &Trajectory<CompartmentState>) -> Option<Self> {
        let (_, initial) = trajectory.first()?;
        let (final_time, final_state) = trajectory.last()?;

        let (peak_index, peak_time, peak_infected) = trajectory.iter().enumerate().fold(
            (0, trajectory.times()[0], initial.infected),
            |peak, (index, (t, state))| {
                if state.infected > peak.2 {
                    (index, t, state.infected)
                } else {
                    peak
                }
            },
        );

        let resolved = final_state.recovered + final_state.deceased;
        let case_fatality = if resolved > 0.0 {
            final_state.deceased / resolved
        } else {
            0.0
        };

        Some(Self {
            final_time,
            final_state: *final_state,
            peak_infected,
            peak_index,
            peak_time,
            total_infected: initial.susceptible - final_state.susceptible,
            case_fatality,
        })
    }
}
