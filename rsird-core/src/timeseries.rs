//! Time handling for solving a model over a sequence of output times.

use crate::errors::{RSIRDError, RSIRDResult};
use ndarray::{Array, Array1};
use serde::{Deserialize, Serialize};

pub type FloatValue = f64;
pub type Time = f64;

/// An ordered set of times at which a model state is reported.
///
/// The grid is guaranteed to contain at least two values and to be strictly increasing.
/// Once constructed it is immutable.
///
/// The solver advances from one grid value to the next, so the grid bounds the total
/// amount of work but not the internal step size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Time>", into = "Vec<Time>")]
pub struct TimeGrid {
    values: Array1<Time>,
}

impl TimeGrid {
    /// Create a grid from explicit values.
    ///
    /// Fails with [`RSIRDError::InvalidInput`] if fewer than two values are given,
    /// any value is non-finite or the values are not strictly increasing.
    pub fn new(values: Array1<Time>) -> RSIRDResult<Self> {
        if values.len() < 2 {
            return Err(RSIRDError::InvalidInput(format!(
                "time grid requires at least 2 points, got {}",
                values.len()
            )));
        }
        if let Some((i, t)) = values.iter().enumerate().find(|(_, t)| !t.is_finite()) {
            return Err(RSIRDError::InvalidInput(format!(
                "time grid value at index {} is not finite ({})",
                i, t
            )));
        }
        for (i, pair) in values.windows(2).into_iter().enumerate() {
            if pair[1] <= pair[0] {
                return Err(RSIRDError::InvalidInput(format!(
                    "time grid must be strictly increasing: t[{}]={} is followed by t[{}]={}",
                    i,
                    pair[0],
                    i + 1,
                    pair[1]
                )));
            }
        }
        Ok(Self { values })
    }

    /// Create `n` evenly spaced values between `start` and `end` (both inclusive).
    pub fn linspace(start: Time, end: Time, n: usize) -> RSIRDResult<Self> {
        Self::new(Array::linspace(start, end, n))
    }

    pub fn from_vec(values: Vec<Time>) -> RSIRDResult<Self> {
        Self::new(Array1::from_vec(values))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false as a valid grid contains at least two values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the time value at a given index
    pub fn at(&self, index: usize) -> Option<Time> {
        self.values.get(index).copied()
    }

    pub fn first(&self) -> Time {
        self.values[0]
    }

    pub fn last(&self) -> Time {
        self.values[self.values.len() - 1]
    }

    pub fn values(&self) -> &Array1<Time> {
        &self.values
    }

    /// Iterate over the consecutive `(t_current, t_next)` pairs of the grid.
    pub fn intervals(&self) -> impl Iterator<Item = (Time, Time)> + '_ {
        self.values
            .iter()
            .zip(self.values.iter().skip(1))
            .map(|(a, b)| (*a, *b))
    }
}

impl TryFrom<Vec<Time>> for TimeGrid {
    type Error = RSIRDError;

    fn try_from(values: Vec<Time>) -> Result<Self, Self::Error> {
        Self::from_vec(values)
    }
}

impl From<TimeGrid> for Vec<Time> {
    fn from(grid: TimeGrid) -> Self {
        grid.values.to_vec()
    }
}
