//! Compartments of the SIRD model and the transitions between them.

use ode_solvers::Vector4;
use rsird_core::errors::{RSIRDError, RSIRDResult};
use rsird_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Vector representation of a [`CompartmentState`] used by the solvers.
///
/// Ordered as `[S, I, R, D]`.
pub type ModelState = Vector4<FloatValue>;

/// A mutually exclusive population subgroup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Infected,
    Recovered,
    Deceased,
}

impl Compartment {
    /// All compartments in state vector order
    pub const ALL: [Compartment; 4] = [
        Compartment::Susceptible,
        Compartment::Infected,
        Compartment::Recovered,
        Compartment::Deceased,
    ];

    /// Position of the compartment in [`ModelState`]
    pub fn index(self) -> usize {
        match self {
            Compartment::Susceptible => 0,
            Compartment::Infected => 1,
            Compartment::Recovered => 2,
            Compartment::Deceased => 3,
        }
    }

    /// Lower case identifier, used for column names
    pub fn name(self) -> &'static str {
        match self {
            Compartment::Susceptible => "susceptible",
            Compartment::Infected => "infected",
            Compartment::Recovered => "recovered",
            Compartment::Deceased => "deceased",
        }
    }

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            Compartment::Susceptible => "Susceptible",
            Compartment::Infected => "Infected",
            Compartment::Recovered => "Recovered with immunity",
            Compartment::Deceased => "Deceased",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Number of individuals in each compartment at a single instant.
///
/// For a valid epidemiological state every value is non-negative and the values sum to the
/// total population. A state is never modified once produced by the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompartmentState {
    pub susceptible: FloatValue,
    pub infected: FloatValue,
    pub recovered: FloatValue,
    pub deceased: FloatValue,
}

/// Instantaneous rate of change of each compartment.
///
/// Shares the layout of [`CompartmentState`], with each value in individuals per unit time.
pub type Rates = CompartmentState;

impl CompartmentState {
    pub fn new(
        susceptible: FloatValue,
        infected: FloatValue,
        recovered: FloatValue,
        deceased: FloatValue,
    ) -> Self {
        Self {
            susceptible,
            infected,
            recovered,
            deceased,
        }
    }

    /// Build an initial condition where everyone not infected, recovered or deceased
    /// is susceptible.
    ///
    /// Fails if the counts are negative, not finite or exceed the population.
    pub fn from_population(
        population: FloatValue,
        infected: FloatValue,
        recovered: FloatValue,
        deceased: FloatValue,
    ) -> RSIRDResult<Self> {
        let counts = [
            ("population", population),
            ("infected", infected),
            ("recovered", recovered),
            ("deceased", deceased),
        ];
        for (name, value) in counts {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RSIRDError::InvalidInput(format!(
                    "initial {} count must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }

        let susceptible = population - infected - recovered - deceased;
        if susceptible < 0.0 {
            return Err(RSIRDError::InvalidInput(format!(
                "initial infected, recovered and deceased counts ({}) exceed the population ({})",
                infected + recovered + deceased,
                population
            )));
        }
        Ok(Self::new(susceptible, infected, recovered, deceased))
    }

    pub fn get(&self, compartment: Compartment) -> FloatValue {
        match compartment {
            Compartment::Susceptible => self.susceptible,
            Compartment::Infected => self.infected,
            Compartment::Recovered => self.recovered,
            Compartment::Deceased => self.deceased,
        }
    }

    pub fn get_mut(&mut self, compartment: Compartment) -> &mut FloatValue {
        match compartment {
            Compartment::Susceptible => &mut self.susceptible,
            Compartment::Infected => &mut self.infected,
            Compartment::Recovered => &mut self.recovered,
            Compartment::Deceased => &mut self.deceased,
        }
    }

    /// Sum over all compartments
    pub fn total(&self) -> FloatValue {
        self.susceptible + self.infected + self.recovered + self.deceased
    }

    pub fn to_array(&self) -> [FloatValue; 4] {
        [
            self.susceptible,
            self.infected,
            self.recovered,
            self.deceased,
        ]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Compartment, FloatValue)> + '_ {
        Compartment::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Index<Compartment> for CompartmentState {
    type Output = FloatValue;

    fn index(&self, compartment: Compartment) -> &Self::Output {
        match compartment {
            Compartment::Susceptible => &self.susceptible,
            Compartment::Infected => &self.infected,
            Compartment::Recovered => &self.recovered,
            Compartment::Deceased => &self.deceased,
        }
    }
}

impl From<[FloatValue; 4]> for CompartmentState {
    fn from(values: [FloatValue; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }
}

impl From<&ModelState> for CompartmentState {
    fn from(y: &ModelState) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }
}

impl From<ModelState> for CompartmentState {
    fn from(y: ModelState) -> Self {
        Self::from(&y)
    }
}

impl From<CompartmentState> for ModelState {
    fn from(state: CompartmentState) -> Self {
        ModelState::new(
            state.susceptible,
            state.infected,
            state.recovered,
            state.deceased,
        )
    }
}

/// A process moving individuals from one compartment to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flow {
    /// Susceptible individuals infected through contact with infected individuals
    Infection,
    Recovery,
    Death,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub flow: Flow,
    pub from: Compartment,
    pub to: Compartment,
}

pub const N_FLOWS: usize = 3;

/// Every flow in the model.
///
/// Each flow is removed from exactly one compartment and added to exactly one other.
/// No births, waning immunity or reinfection are modelled.
pub const TRANSITIONS: [Transition; N_FLOWS] = [
    Transition {
        flow: Flow::Infection,
        from: Compartment::Susceptible,
        to: Compartment::Infected,
    },
    Transition {
        flow: Flow::Recovery,
        from: Compartment::Infected,
        to: Compartment::Recovered,
    },
    Transition {
        flow: Flow::Death,
        from: Compartment::Infected,
        to: Compartment::Deceased,
    },
];

/// Net change of each compartment (rows, state order) per unit of each flow (columns,
/// [`TRANSITIONS`] order).
pub fn stoichiometry() -> [[i32; N_FLOWS]; 4] {
    let mut matrix = [[0; N_FLOWS]; 4];
    for (column, transition) in TRANSITIONS.iter().enumerate() {
        matrix[transition.from.index()][column] -= 1;
        matrix[transition.to.index()][column] += 1;
    }
    matrix
}
