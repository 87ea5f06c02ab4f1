//! SIRD epidemic model
//!
//! Runs the model in `rsird-components` from a TOML configuration and reports the
//! resulting trajectory.

pub mod config;
pub mod report;

#[cfg(feature = "python")]
pub mod python;

pub use rsird_components;
pub use rsird_core;
