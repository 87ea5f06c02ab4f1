//! Solving an [`IVP`] across every interval of a [`TimeGrid`].
//!
//! Each interval `[t_i, t_{i+1}]` is solved as its own initial-value problem starting from
//! the state reported at `t_i`. The internal step size is chosen by the solver and never
//! straddles a grid point, so the grid only controls where output is reported.

use crate::errors::{RSIRDError, RSIRDResult};
use crate::ivp::{get_step_at, IVPBuilder, IVP};
use crate::timeseries::{FloatValue, Time, TimeGrid};
use crate::trajectory::Trajectory;
use log::trace;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, Dim, OVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use std::str::FromStr;
use std::sync::Arc;

/// Fraction of an interval that a solver output may deviate from the requested time
const OUTPUT_TIME_TOLERANCE: Time = 1e-6;

/// Allowance for rounding when counting the fixed steps needed to cover an interval
const STEP_COUNT_SLACK: FloatValue = 1e-9;

/// Adaptive solvers integrate slightly past the interval end so that the end point falls
/// inside an accepted step and is produced by dense output.
const DENSE_OVERSHOOT: Time = 1e-2;

/// Integration scheme used within each interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Classic 4th order Runge-Kutta with a fixed step no larger than `step_size`
    #[default]
    Rk4,
    /// Adaptive Dormand-Prince 5(4)
    Dopri5,
    /// Adaptive Dormand-Prince 8(5,3)
    Dop853,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Rk4 => "rk4",
            Method::Dopri5 => "dopri5",
            Method::Dop853 => "dop853",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Method {
    type Err = RSIRDError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rk4" => Ok(Method::Rk4),
            "dopri5" => Ok(Method::Dopri5),
            "dop853" => Ok(Method::Dop853),
            other => Err(RSIRDError::InvalidInput(format!(
                "unknown integration method '{}' (expected rk4, dopri5 or dop853)",
                other
            ))),
        }
    }
}

/// Solver options for the ODE integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub method: Method,
    /// Largest internal step taken by [`Method::Rk4`].
    ///
    /// Should be small relative to the fastest rate in the model.
    ///
    /// Default: 0.1
    pub step_size: Time,
    /// Relative tolerance of the adaptive methods.
    ///
    /// Default: 1e-8
    pub rtol: FloatValue,
    /// Absolute tolerance of the adaptive methods.
    ///
    /// Default: 1e-8
    pub atol: FloatValue,
    /// Relative band outside of the valid range of a state value before the solution is
    /// considered unstable.
    ///
    /// Default: 1e-3
    pub drift_tolerance: FloatValue,
    /// Relative tolerance when checking conserved quantities of the initial state.
    ///
    /// Default: 1e-6
    pub population_tolerance: FloatValue,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            method: Method::Rk4,
            step_size: 0.1,
            rtol: 1e-8,
            atol: 1e-8,
            drift_tolerance: 1e-3,
            population_tolerance: 1e-6,
        }
    }
}

impl SolverOptions {
    pub fn with_method(self, method: Method) -> Self {
        Self { method, ..self }
    }

    pub fn with_step_size(self, step_size: Time) -> Self {
        Self { step_size, ..self }
    }

    pub fn validate(&self) -> RSIRDResult<()> {
        let positive = [
            ("step_size", self.step_size),
            ("rtol", self.rtol),
            ("atol", self.atol),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RSIRDError::InvalidInput(format!(
                    "solver option {} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("drift_tolerance", self.drift_tolerance),
            ("population_tolerance", self.population_tolerance),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RSIRDError::InvalidInput(format!(
                    "solver option {} must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Evaluates a component with its time axis shifted by `offset`.
///
/// The adaptive solvers compare times by magnitude when producing dense output, so each
/// interval is solved on a local axis starting at zero.
struct TimeShifted<C> {
    component: Arc<C>,
    offset: Time,
}

impl<C, S> IVP<Time, S> for TimeShifted<C>
where
    C: IVP<Time, S>,
{
    fn calculate_dy_dt(&self, t: Time, y: &S, dy_dt: &mut S) {
        self.component.calculate_dy_dt(t + self.offset, y, dy_dt)
    }
}

fn integration_error<E: fmt::Debug>(t_start: Time, t_end: Time, error: E) -> RSIRDError {
    RSIRDError::Integration {
        t_start,
        t_end,
        message: format!("{:?}", error),
    }
}

/// Solve a single interval, returning the state at `t_next`.
pub fn solve_interval<C, D>(
    component: Arc<C>,
    y0: OVector<FloatValue, D>,
    t_current: Time,
    t_next: Time,
    options: &SolverOptions,
) -> RSIRDResult<OVector<FloatValue, D>>
where
    C: IVP<Time, OVector<FloatValue, D>>,
    D: Dim,
    OVector<FloatValue, D>: Mul<FloatValue, Output = OVector<FloatValue, D>>,
    DefaultAllocator: Allocator<FloatValue, D>,
{
    let dt = t_next - t_current;
    if !(dt.is_finite() && dt > 0.0) {
        return Err(RSIRDError::InvalidInput(format!(
            "interval [{}, {}] is empty or not finite",
            t_current, t_next
        )));
    }
    let tolerance = dt * OUTPUT_TIME_TOLERANCE;

    match options.method {
        Method::Rk4 => {
            // Equal sub-steps so the last one ends on t_next
            let n_steps = (dt / options.step_size - STEP_COUNT_SLACK).ceil().max(1.0);
            let mut solver =
                IVPBuilder::new(component, y0).to_rk4(t_current, t_next, dt / n_steps);
            solver
                .integrate()
                .map_err(|e| integration_error(t_current, t_next, e))?;
            get_step_at(solver.results(), t_next, tolerance).cloned()
        }
        Method::Dopri5 => {
            let shifted = Arc::new(TimeShifted {
                component,
                offset: t_current,
            });
            let mut solver = IVPBuilder::new(shifted, y0).to_dopri5(
                0.0,
                dt * (1.0 + DENSE_OVERSHOOT),
                dt,
                options.rtol,
                options.atol,
            );
            solver
                .integrate()
                .map_err(|e| integration_error(t_current, t_next, e))?;
            get_step_at(solver.results(), dt, tolerance).cloned()
        }
        Method::Dop853 => {
            let shifted = Arc::new(TimeShifted {
                component,
                offset: t_current,
            });
            let mut solver = IVPBuilder::new(shifted, y0).to_dop853(
                0.0,
                dt * (1.0 + DENSE_OVERSHOOT),
                dt,
                options.rtol,
                options.atol,
            );
            solver
                .integrate()
                .map_err(|e| integration_error(t_current, t_next, e))?;
            get_step_at(solver.results(), dt, tolerance).cloned()
        }
    }
}

/// Solve a component across a time grid.
///
/// `check` is called with the grid index, time and state after every interval and may
/// reject the state, which aborts the solve. The initial state is not checked.
///
/// The first state of the returned trajectory is `y0`, unchanged.
pub fn solve_on_grid<C, D, F>(
    component: Arc<C>,
    y0: OVector<FloatValue, D>,
    time_grid: &TimeGrid,
    options: &SolverOptions,
    mut check: F,
) -> RSIRDResult<Trajectory<OVector<FloatValue, D>>>
where
    C: IVP<Time, OVector<FloatValue, D>>,
    D: Dim,
    OVector<FloatValue, D>: Mul<FloatValue, Output = OVector<FloatValue, D>>,
    DefaultAllocator: Allocator<FloatValue, D>,
    F: FnMut(usize, Time, &OVector<FloatValue, D>) -> RSIRDResult<()>,
{
    options.validate()?;

    let mut states = Vec::with_capacity(time_grid.len());
    let mut y_current = y0;

    for (index, (t_current, t_next)) in time_grid.intervals().enumerate() {
        let y_next = solve_interval(
            Arc::clone(&component),
            y_current.clone(),
            t_current,
            t_next,
            options,
        )?;
        trace!(
            "Solved interval {} [{}, {}] with {}",
            index,
            t_current,
            t_next,
            options.method
        );
        check(index + 1, t_next, &y_next)?;

        states.push(y_current);
        y_current = y_next;
    }
    states.push(y_current);

    Ok(Trajectory::new(time_grid.values().to_vec(), states))
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ode_solvers::Vector1;

    type State = Vector1<FloatValue>;

    /// y' = r y
    struct Growth {
        r: FloatValue,
    }

    impl IVP<Time, State> for Growth {
        fn calculate_dy_dt(&self, _t: Time, y: &State, dy_dt: &mut State) {
            dy_dt[0] = self.r * y[0];
        }
    }

    /// y' = t, so y(t) = y0 + (t^2 - t0^2) / 2
    struct Ramp;

    impl IVP<Time, State> for Ramp {
        fn calculate_dy_dt(&self, t: Time, _y: &State, dy_dt: &mut State) {
            dy_dt[0] = t;
        }
    }

    fn no_check(_: usize, _: Time, _: &State) -> RSIRDResult<()> {
        Ok(())
    }

    #[test]
    fn first_state_is_initial_state() {
        let grid = TimeGrid::linspace(0.0, 10.0, 11).unwrap();
        let y0 = State::new(0.123456789);
        let trajectory = solve_on_grid(
            Arc::new(Growth { r: -0.3 }),
            y0,
            &grid,
            &SolverOptions::default(),
            no_check,
        )
        .unwrap();

        assert_eq!(trajectory.len(), grid.len());
        assert_eq!(trajectory.first().unwrap(), (0.0, &y0));
        assert_eq!(trajectory.times(), grid.values().as_slice().unwrap());
    }

    #[test]
    fn all_methods_match_analytic_solution() {
        let grid = TimeGrid::from_vec(vec![0.0, 0.3, 1.0, 2.5, 4.0]).unwrap();

        for method in [Method::Rk4, Method::Dopri5, Method::Dop853] {
            let options = SolverOptions::default().with_method(method);
            let trajectory = solve_on_grid(
                Arc::new(Growth { r: -0.5 }),
                State::new(2.0),
                &grid,
                &options,
                no_check,
            )
            .unwrap();

            for (t, y) in trajectory.iter() {
                let expected = 2.0 * (-0.5 * t).exp();
                assert!(
                    is_close!(y[0], expected, rel_tol = 1e-6),
                    "{} at t={}: {} != {}",
                    method,
                    t,
                    y[0],
                    expected
                );
            }
        }
    }

    #[test]
    fn adaptive_methods_use_absolute_time() {
        let grids = [
            vec![-3.0, -1.0, 2.0],
            vec![-3.0, -1.0],
            vec![1.0, 3.0],
            vec![0.0, 0.5, 1.0],
        ];

        for values in grids {
            let grid = TimeGrid::from_vec(values).unwrap();
            // (t_end^2 - t_start^2) / 2
            let expected = (grid.last().powi(2) - grid.first().powi(2)) / 2.0;

            for method in [Method::Rk4, Method::Dopri5, Method::Dop853] {
                let options = SolverOptions::default().with_method(method);
                let trajectory =
                    solve_on_grid(Arc::new(Ramp), State::new(0.0), &grid, &options, no_check)
                        .unwrap();

                let (t, last) = trajectory.last().unwrap();
                assert!(
                    is_close!(last[0], expected, abs_tol = 1e-8),
                    "{} at t={}: {} != {}",
                    method,
                    t,
                    last[0],
                    expected
                );
            }
        }
    }

    #[test]
    fn rk4_step_never_exceeds_step_size() {
        // A coarse grid with a small step gives the same answer as a fine grid
        let coarse = TimeGrid::from_vec(vec![0.0, 5.0]).unwrap();
        let fine = TimeGrid::linspace(0.0, 5.0, 51).unwrap();
        let options = SolverOptions::default();

        let solve = |grid: &TimeGrid| {
            let trajectory = solve_on_grid(
                Arc::new(Growth { r: 0.4 }),
                State::new(1.0),
                grid,
                &options,
                no_check,
            )
            .unwrap();
            trajectory.last().unwrap().1[0]
        };

        assert!(is_close!(solve(&coarse), solve(&fine), rel_tol = 1e-12));
    }

    #[test]
    fn check_failure_aborts() {
        let grid = TimeGrid::linspace(0.0, 10.0, 11).unwrap();
        let mut calls = Vec::new();

        let err = solve_on_grid(
            Arc::new(Growth { r: 1.0 }),
            State::new(1.0),
            &grid,
            &SolverOptions::default(),
            |index, time, y: &State| {
                calls.push(index);
                if y[0] > 100.0 {
                    return Err(RSIRDError::NumericalInstability {
                        index,
                        time,
                        reason: "too large".to_string(),
                    });
                }
                Ok(())
            },
        )
        .unwrap_err();

        // e^5 > 100 > e^4
        assert_eq!(calls, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            err,
            RSIRDError::NumericalInstability {
                index: 5,
                time: 5.0,
                reason: "too large".to_string()
            }
        );
    }

    #[test]
    fn invalid_options() {
        let grid = TimeGrid::linspace(0.0, 1.0, 2).unwrap();
        for options in [
            SolverOptions::default().with_step_size(0.0),
            SolverOptions::default().with_step_size(f64::NAN),
            SolverOptions {
                rtol: -1.0,
                ..Default::default()
            },
            SolverOptions {
                drift_tolerance: f64::INFINITY,
                ..Default::default()
            },
        ] {
            let err = solve_on_grid(
                Arc::new(Growth { r: 1.0 }),
                State::new(1.0),
                &grid,
                &options,
                no_check,
            )
            .unwrap_err();
            assert!(matches!(err, RSIRDError::InvalidInput(_)));
        }
    }

    #[test]
    fn method_names() {
        assert_eq!("rk4".parse::<Method>().unwrap(), Method::Rk4);
        assert_eq!("DOPRI5".parse::<Method>().unwrap(), Method::Dopri5);
        assert_eq!(Method::Dop853.to_string(), "dop853");
        assert!("euler".parse::<Method>().is_err());
    }

    #[test]
    fn options_deserialise_with_defaults() {
        let options: SolverOptions = toml::from_str("method = \"dopri5\"").unwrap();
        assert_eq!(options.method, Method::Dopri5);
        assert_eq!(options.step_size, 0.1);
    }
}
