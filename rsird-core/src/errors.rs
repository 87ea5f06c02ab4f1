use crate::timeseries::Time;
use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RSIRDError {
    /// Rejected before any stepping takes place.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A produced state left the physically valid range or became non-finite.
    ///
    /// Usually the step size is too large for the rates in use.
    #[error("Numerical instability at index {index} (t={time}): {reason}")]
    NumericalInstability {
        index: usize,
        time: Time,
        reason: String,
    },
    #[error("Integration failed between t={t_start} and t={t_end}: {message}")]
    Integration {
        t_start: Time,
        t_end: Time,
        message: String,
    },
}

/// Convenience type for `Result<T, RSIRDError>`.
pub type RSIRDResult<T> = Result<T, RSIRDError>;
