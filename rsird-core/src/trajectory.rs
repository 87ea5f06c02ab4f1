use crate::timeseries::Time;
use serde::{Deserialize, Serialize};

/// The states produced by solving a model, one per time in the grid.
///
/// `times` and `states` are index aligned and always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory<S> {
    times: Vec<Time>,
    states: Vec<S>,
}

impl<S> Trajectory<S> {
    /// Panics if `times` and `states` differ in length
    pub fn new(times: Vec<Time>, states: Vec<S>) -> Self {
        assert_eq!(
            times.len(),
            states.len(),
            "trajectory times and states must have the same length"
        );
        Self { times, states }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn get(&self, index: usize) -> Option<(Time, &S)> {
        Some((*self.times.get(index)?, self.states.get(index)?))
    }

    pub fn first(&self) -> Option<(Time, &S)> {
        self.get(0)
    }

    pub fn last(&self) -> Option<(Time, &S)> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Time, &S)> + '_ {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Convert each state, keeping the times.
    pub fn map<U, F>(self, f: F) -> Trajectory<U>
    where
        F: FnMut(S) -> U,
    {
        Trajectory {
            times: self.times,
            states: self.states.into_iter().map(f).collect(),
        }
    }
}
