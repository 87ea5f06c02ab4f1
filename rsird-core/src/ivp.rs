//! Initial-value problems solved with `ode_solvers`.
//!
//! A model implements [`IVP`] to describe its right-hand side. [`IVPBuilder`] pairs the
//! model with an initial state and hands it to one of the `ode_solvers` steppers.

use crate::errors::{RSIRDError, RSIRDResult};
use crate::timeseries::{FloatValue, Time};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, Dim, OVector};
use ode_solvers::dop_shared::{OutputType, SolverResult};
use ode_solvers::{Dop853, Dopri5, Rk4, System};
use std::ops::Mul;
use std::sync::Arc;

// Step control defaults of `Dop853::new`
const DOP853_SAFETY_FACTOR: FloatValue = 0.9;
const DOP853_FAC_MIN: FloatValue = 0.333;
const DOP853_FAC_MAX: FloatValue = 6.0;
const MAX_STEPS: u32 = 100_000;

/// Stiffness is tested every `n` accepted steps; no solve gets this far.
const NO_STIFFNESS_CHECK: u32 = u32::MAX;

/// A system of first-order ordinary differential equations, `dy/dt = f(t, y)`.
pub trait IVP<T, S> {
    /// Write the rate of change of `y` at time `t` into `dy_dt`.
    fn calculate_dy_dt(&self, t: T, y: &S, dy_dt: &mut S);
}

/// An IVP ready to be handed to a solver.
pub struct IVPBuilder<C, S> {
    component: Arc<C>,
    y0: S,
}

impl<C, S> System<Time, S> for IVPBuilder<C, S>
where
    C: IVP<Time, S>,
{
    fn system(&self, t: Time, y: &S, dy: &mut S) {
        self.component.calculate_dy_dt(t, y, dy)
    }
}

impl<C, D> IVPBuilder<C, OVector<FloatValue, D>>
where
    C: IVP<Time, OVector<FloatValue, D>>,
    D: Dim,
    OVector<FloatValue, D>: Mul<FloatValue, Output = OVector<FloatValue, D>>,
    DefaultAllocator: Allocator<FloatValue, D>,
{
    pub fn new(component: Arc<C>, y0: OVector<FloatValue, D>) -> Self {
        Self { component, y0 }
    }

    /// Fixed step 4th order Runge-Kutta between `t0` and `t1`.
    pub fn to_rk4(
        self,
        t0: Time,
        t1: Time,
        step: Time,
    ) -> Rk4<Time, OVector<FloatValue, D>, Self> {
        let y0 = self.y0.clone();
        Rk4::new(self, t0, y0, t1, step)
    }

    /// Adaptive Dormand-Prince 5(4) with dense output every `dx`.
    pub fn to_dopri5(
        self,
        t0: Time,
        t1: Time,
        dx: Time,
        rtol: FloatValue,
        atol: FloatValue,
    ) -> Dopri5<Time, OVector<FloatValue, D>, Self> {
        let y0 = self.y0.clone();
        Dopri5::new(self, t0, t1, dx, y0, rtol, atol)
    }

    /// Adaptive Dormand-Prince 8(5,3) with dense output every `dx`.
    ///
    /// Uses the `ode_solvers` default step control but never tests for stiffness. The
    /// stiffness estimate misfires on right-hand sides that depend only on time.
    pub fn to_dop853(
        self,
        t0: Time,
        t1: Time,
        dx: Time,
        rtol: FloatValue,
        atol: FloatValue,
    ) -> Dop853<Time, OVector<FloatValue, D>, Self> {
        let y0 = self.y0.clone();
        Dop853::from_param(
            self,
            t0,
            t1,
            dx,
            y0,
            rtol,
            atol,
            DOP853_SAFETY_FACTOR,
            0.0,
            DOP853_FAC_MIN,
            DOP853_FAC_MAX,
            t1 - t0,
            0.0,
            MAX_STEPS,
            NO_STIFFNESS_CHECK,
            OutputType::Dense,
        )
    }
}

/// Find the solver output at `t_expected`.
///
/// Solvers accumulate time in floating point so the final output may not land exactly on
/// the requested time, and a fixed step solver may take one step past it. The output
/// closest to `t_expected` is used if it is within `tolerance`.
pub fn get_step_at<S>(
    results: &SolverResult<Time, S>,
    t_expected: Time,
    tolerance: Time,
) -> RSIRDResult<&S> {
    let (t, y) = results.get();

    let closest = t
        .iter()
        .zip(y.iter())
        .min_by(|(a, _), (b, _)| (*a - t_expected).abs().total_cmp(&(*b - t_expected).abs()));

    match closest {
        Some((t_found, y_found)) if (t_found - t_expected).abs() <= tolerance => Ok(y_found),
        Some((t_found, _)) => Err(RSIRDError::Integration {
            t_start: t[0],
            t_end: t_expected,
            message: format!(
                "solver produced no output at t={} (closest output at t={})",
                t_expected, t_found
            ),
        }),
        None => Err(RSIRDError::Integration {
            t_start: t_expected,
            t_end: t_expected,
            message: "solver produced no output".to_string(),
        }),
    }
}
