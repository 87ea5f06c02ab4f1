//! SIRD model parameters

use rsird_core::errors::{RSIRDError, RSIRDResult};
use rsird_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};

/// Parameters of the SIRD model.
///
/// All rates are per capita and per unit time (days in the default configuration).
/// Parameters are constant for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParameters {
    /// Rate at which susceptible individuals become infected per infectious contact (β).
    ///
    /// Default: 0.3 / day
    pub contact_rate: FloatValue,

    /// Rate at which infected individuals recover (γ).
    ///
    /// The mean infectious period is `1 / recovery_rate`.
    ///
    /// Default: 0.1 / day
    pub recovery_rate: FloatValue,

    /// Rate at which infected individuals die (θ).
    ///
    /// Default: 0.015 / day
    pub mortality_rate: FloatValue,

    /// Total population (N), constant over the run.
    ///
    /// Default: 5,611,000
    pub population: FloatValue,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            contact_rate: 0.3,
            recovery_rate: 0.1,
            mortality_rate: 0.015,
            population: 5_611_000.0,
        }
    }
}

impl ModelParameters {
    pub fn new(
        contact_rate: FloatValue,
        recovery_rate: FloatValue,
        mortality_rate: FloatValue,
        population: FloatValue,
    ) -> Self {
        Self {
            contact_rate,
            recovery_rate,
            mortality_rate,
            population,
        }
    }

    /// Check that the rates are finite and non-negative and the population is positive.
    pub fn validate(&self) -> RSIRDResult<()> {
        let rates = [
            ("contact_rate", self.contact_rate),
            ("recovery_rate", self.recovery_rate),
            ("mortality_rate", self.mortality_rate),
        ];
        for (name, value) in rates {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RSIRDError::InvalidInput(format!(
                    "{} must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }

        if !(self.population.is_finite() && self.population > 0.0) {
            return Err(RSIRDError::InvalidInput(format!(
                "population must be positive and finite, got {}",
                self.population
            )));
        }
        Ok(())
    }

    /// Rate at which individuals leave the infected compartment (γ + θ)
    pub fn removal_rate(&self) -> FloatValue {
        self.recovery_rate + self.mortality_rate
    }

    /// Basic reproduction number, `β / (γ + θ)`.
    ///
    /// Not finite when nobody leaves the infected compartment.
    pub fn basic_reproduction_number(&self) -> FloatValue {
        self.contact_rate / self.removal_rate()
    }

    /// The fastest per capita rate in the model.
    ///
    /// A fixed integration step should be small compared to the inverse of this value.
    pub fn max_rate(&self) -> FloatValue {
        self.contact_rate
            .max(self.recovery_rate)
            .max(self.mortality_rate)
    }
}
