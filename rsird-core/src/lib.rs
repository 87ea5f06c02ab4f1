//! Core traits and solvers for integrating compartmental models.
//!
//! A model describes its right-hand side through the [`ivp::IVP`] trait and is solved
//! interval by interval over a [`timeseries::TimeGrid`] by [`solver::solve_on_grid`],
//! producing a [`trajectory::Trajectory`].

pub mod errors;
pub mod ivp;
pub mod solver;
pub mod timeseries;
pub mod trajectory;
