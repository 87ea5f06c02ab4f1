//! SIRD epidemic model
//!
//! This crate provides the Susceptible-Infected-Recovered-Deceased compartmental model and
//! its integration over a time grid using the solvers in `rsird-core`.
//!
//! # Module Organisation
//!
//! - `compartments`: the compartment state and the transitions between compartments
//! - `parameters`: contact, recovery and mortality rates and the population size
//! - `sird`: the rate equations and the integrator entry point
//! - `summary`: headline values derived from a solved trajectory

pub mod compartments;
pub mod parameters;
pub mod sird;
pub mod summary;

pub use compartments::{Compartment, CompartmentState, ModelState, Rates};
pub use parameters::ModelParameters;
pub use sird::{derivative, integrate, SIRDModel};
pub use summary::{CompartmentColumns, EpidemicSummary};
