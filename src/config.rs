//! Run configuration
//!
//! A run is described by a TOML file in which every field is optional. Missing values
//! fall back to the defaults, which describe the reference outbreak of 441 infected and
//! 9 deceased individuals in a population of 5,611,000.

use anyhow::{Context, Result};
use rsird_components::{CompartmentState, ModelParameters};
use rsird_core::solver::{Method, SolverOptions};
use rsird_core::timeseries::{FloatValue, Time, TimeGrid};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Size of the population and the initial condition.
///
/// Everyone not infected, recovered or deceased at the start is susceptible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationConfig {
    pub total: FloatValue,
    pub infected: FloatValue,
    pub recovered: FloatValue,
    pub deceased: FloatValue,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            total: 5_611_000.0,
            infected: 441.0,
            recovered: 0.0,
            deceased: 9.0,
        }
    }
}

/// Per capita rates, per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatesConfig {
    /// β
    pub contact: FloatValue,
    /// γ
    pub recovery: FloatValue,
    /// θ
    pub mortality: FloatValue,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            contact: 0.3,
            recovery: 0.1,
            mortality: 0.015,
        }
    }
}

/// Evenly spaced reporting times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeConfig {
    pub start: Time,
    /// Last reported time, inclusive
    pub horizon: Time,
    /// Number of reported times including both ends
    pub points: usize,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            horizon: 365.0,
            points: 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub population: PopulationConfig,
    pub rates: RatesConfig,
    pub time: TimeConfig,
    pub solver: SolverOptions,
}

/// Values given on the command line, which take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub population: Option<FloatValue>,
    pub infected: Option<FloatValue>,
    pub recovered: Option<FloatValue>,
    pub deceased: Option<FloatValue>,
    pub beta: Option<FloatValue>,
    pub gamma: Option<FloatValue>,
    pub theta: Option<FloatValue>,
    pub horizon: Option<Time>,
    pub points: Option<usize>,
    pub method: Option<Method>,
    pub step_size: Option<Time>,
}

impl RunConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid run configuration")
    }

    /// Read a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))
    }

    /// Load a configuration file if given, otherwise use the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialise run configuration")
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut self.population.total, overrides.population);
        set(&mut self.population.infected, overrides.infected);
        set(&mut self.population.recovered, overrides.recovered);
        set(&mut self.population.deceased, overrides.deceased);
        set(&mut self.rates.contact, overrides.beta);
        set(&mut self.rates.recovery, overrides.gamma);
        set(&mut self.rates.mortality, overrides.theta);
        set(&mut self.time.horizon, overrides.horizon);
        set(&mut self.time.points, overrides.points);
        set(&mut self.solver.method, overrides.method);
        set(&mut self.solver.step_size, overrides.step_size);
        self
    }

    pub fn parameters(&self) -> ModelParameters {
        ModelParameters::new(
            self.rates.contact,
            self.rates.recovery,
            self.rates.mortality,
            self.population.total,
        )
    }

    pub fn initial_state(&self) -> Result<CompartmentState> {
        let population = &self.population;
        CompartmentState::from_population(
            population.total,
            population.infected,
            population.recovered,
            population.deceased,
        )
        .context("Invalid initial population")
    }

    pub fn time_grid(&self) -> Result<TimeGrid> {
        TimeGrid::linspace(self.time.start, self.time.horizon, self.time.points)
            .context("Invalid time configuration")
    }

    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver
    }
}
