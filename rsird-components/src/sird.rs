//! SIRD model
//!
//! The population is split into four compartments which exchange individuals through
//! three flows:
//!
//! $$ \frac{dS}{dt} = -\frac{\beta S I}{N} $$
//! $$ \frac{dI}{dt} = \frac{\beta S I}{N} - \gamma I - \theta I $$
//! $$ \frac{dR}{dt} = \gamma I $$
//! $$ \frac{dD}{dt} = \theta I $$
//!
//! Where:
//! - $\beta$ is the contact rate
//! - $\gamma$ is the recovery rate
//! - $\theta$ is the mortality rate
//! - $N$ is the total population
//!
//! Every flow leaves one compartment and enters another, so the total population is
//! conserved.

use crate::compartments::{CompartmentState, ModelState, Rates, N_FLOWS, TRANSITIONS};
use crate::parameters::ModelParameters;
use log::{debug, info, warn};
use rsird_core::errors::{RSIRDError, RSIRDResult};
use rsird_core::ivp::IVP;
use rsird_core::solver::{solve_on_grid, Method, SolverOptions};
use rsird_core::timeseries::{FloatValue, Time, TimeGrid};
use rsird_core::trajectory::Trajectory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Magnitude of each flow in [`TRANSITIONS`] order, individuals per unit time.
pub fn flows(state: &CompartmentState, parameters: &ModelParameters) -> [FloatValue; N_FLOWS] {
    let infection = parameters.contact_rate * state.susceptible * state.infected
        / parameters.population;
    let recovery = parameters.recovery_rate * state.infected;
    let death = parameters.mortality_rate * state.infected;

    [infection, recovery, death]
}

/// Instantaneous rate of change of each compartment.
///
/// Undefined for a non-positive population; validate the parameters first.
pub fn derivative(state: &CompartmentState, parameters: &ModelParameters) -> Rates {
    let mut rates = Rates::default();
    for (transition, flow) in TRANSITIONS.iter().zip(flows(state, parameters)) {
        *rates.get_mut(transition.from) -= flow;
        *rates.get_mut(transition.to) += flow;
    }
    rates
}

/// The SIRD model, ready to be integrated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SIRDModel {
    parameters: ModelParameters,
}

impl SIRDModel {
    pub fn from_parameters(parameters: ModelParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    pub fn derivative(&self, state: &CompartmentState) -> Rates {
        derivative(state, &self.parameters)
    }

    /// Check the initial state against the population invariant.
    fn validate_initial_state(
        &self,
        initial_state: &CompartmentState,
        options: &SolverOptions,
    ) -> RSIRDResult<()> {
        for (compartment, value) in initial_state.iter() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RSIRDError::InvalidInput(format!(
                    "initial {} count must be non-negative and finite, got {}",
                    compartment, value
                )));
            }
        }

        let population = self.parameters.population;
        let total = initial_state.total();
        if (total - population).abs() > options.population_tolerance * population {
            return Err(RSIRDError::InvalidInput(format!(
                "initial compartments sum to {} but the population is {}",
                total, population
            )));
        }
        Ok(())
    }

    /// Whether the fixed step in `options` is longer than the inverse of the fastest rate.
    ///
    /// Adaptive methods choose their own step and are never flagged.
    pub fn step_exceeds_fastest_rate(&self, options: &SolverOptions) -> bool {
        options.method == Method::Rk4
            && options.step_size * self.parameters.max_rate() > 1.0
    }

    /// Integrate the model from `initial_state` at the first time of `time_grid`.
    ///
    /// The returned trajectory holds one state per grid time, starting with
    /// `initial_state`.
    ///
    /// Fails with [`RSIRDError::InvalidInput`] before stepping if the parameters, initial
    /// state or options are invalid, and with [`RSIRDError::NumericalInstability`] if a
    /// produced value is not finite or leaves `[0, N]` by more than the drift tolerance.
    pub fn integrate(
        &self,
        initial_state: &CompartmentState,
        time_grid: &TimeGrid,
        options: &SolverOptions,
    ) -> RSIRDResult<Trajectory<CompartmentState>> {
        self.parameters.validate()?;
        options.validate()?;
        self.validate_initial_state(initial_state, options)?;

        debug!(
            "Integrating SIRD model over {} points [{}, {}] with {} (beta={}, gamma={}, theta={}, N={})",
            time_grid.len(),
            time_grid.first(),
            time_grid.last(),
            options.method,
            self.parameters.contact_rate,
            self.parameters.recovery_rate,
            self.parameters.mortality_rate,
            self.parameters.population
        );

        if self.step_exceeds_fastest_rate(options) {
            warn!(
                "Step size {} exceeds 1 / {} (the fastest rate); the solution may be unstable",
                options.step_size,
                self.parameters.max_rate()
            );
        }

        let population = self.parameters.population;
        let band = options.drift_tolerance * population;
        let mut warned = false;

        let check = |index: usize, time: Time, y: &ModelState| -> RSIRDResult<()> {
            let state = CompartmentState::from(y);
            for (compartment, value) in state.iter() {
                if !value.is_finite() {
                    return Err(RSIRDError::NumericalInstability {
                        index,
                        time,
                        reason: format!("{} is not finite ({})", compartment, value),
                    });
                }
                if value < -band || value > population + band {
                    return Err(RSIRDError::NumericalInstability {
                        index,
                        time,
                        reason: format!(
                            "{} = {} is outside [0, {}]; reduce the step size",
                            compartment, value, population
                        ),
                    });
                }
                if value < 0.0 && !warned {
                    warn!(
                        "{} is slightly negative ({}) at t={}",
                        compartment, value, time
                    );
                    warned = true;
                }
            }
            Ok(())
        };

        let trajectory = solve_on_grid(
            Arc::new(self.to_owned()),
            ModelState::from(*initial_state),
            time_grid,
            options,
            check,
        )?
        .map(CompartmentState::from);

        if let Some((t, state)) = trajectory.last() {
            info!(
                "Solved {} points to t={}: S={:.1} I={:.1} R={:.1} D={:.1}",
                trajectory.len(),
                t,
                state.susceptible,
                state.infected,
                state.recovered,
                state.deceased
            );
        }

        Ok(trajectory)
    }
}

impl IVP<Time, ModelState> for SIRDModel {
    fn calculate_dy_dt(&self, _t: Time, y: &ModelState, dy_dt: &mut ModelState) {
        let rates = self.derivative(&CompartmentState::from(y));
        *dy_dt = ModelState::from(rates);
    }
}

/// Integrate the SIRD model defined by `parameters`.
///
/// See [`SIRDModel::integrate`].
pub fn integrate(
    parameters: &ModelParameters,
    initial_state: &CompartmentState,
    time_grid: &TimeGrid,
    options: &SolverOptions,
) -> RSIRDResult<Trajectory<CompartmentState>> {
    SIRDModel::from_parameters(parameters.clone()).integrate(initial_state, time_grid, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compartments::{stoichiometry, Compartment};
    use is_close::is_close;

    fn parameters() -> ModelParameters {
        ModelParameters::new(0.3, 0.1, 0.015, 1000.0)
    }

    #[test]
    fn derivative_matches_rate_equations() {
        let params = parameters();
        let state = CompartmentState::new(900.0, 80.0, 15.0, 5.0);
        let rates = derivative(&state, &params);

        let infection = 0.3 * 900.0 * 80.0 / 1000.0;
        assert!(is_close!(rates.susceptible, -infection));
        assert!(is_close!(rates.infected, infection - 0.1 * 80.0 - 0.015 * 80.0));
        assert!(is_close!(rates.recovered, 0.1 * 80.0));
        assert!(is_close!(rates.deceased, 0.015 * 80.0));
    }

    #[test]
    fn stoichiometry_conserves_population() {
        // Exact: each flow is removed from one compartment and added to another
        for column in 0..N_FLOWS {
            let net: i32 = stoichiometry().iter().map(|row| row[column]).sum();
            assert_eq!(net, 0, "flow {:?} is not conserved", TRANSITIONS[column].flow);
        }
    }

    #[test]
    fn derivative_sums_to_zero() {
        let params = parameters();
        for state in [
            CompartmentState::new(900.0, 80.0, 15.0, 5.0),
            CompartmentState::new(1000.0, 0.0, 0.0, 0.0),
            CompartmentState::new(0.0, 1000.0, 0.0, 0.0),
            CompartmentState::new(1.0e-3, 999.0, 1e-6, 0.0),
        ] {
            let rates = derivative(&state, &params);
            let scale: FloatValue = rates.to_array().iter().map(|r| r.abs()).sum();
            assert!(
                rates.total().abs() <= 4.0 * f64::EPSILON * scale,
                "{:?} sums to {}",
                rates,
                rates.total()
            );
        }
    }

    #[test]
    fn susceptible_never_increases() {
        let params = parameters();
        let state = CompartmentState::new(10.0, 990.0, 0.0, 0.0);
        assert!(derivative(&state, &params).susceptible <= 0.0);
    }

    #[test]
    fn ivp_matches_derivative() {
        let model = SIRDModel::from_parameters(parameters());
        let state = CompartmentState::new(700.0, 200.0, 90.0, 10.0);
        let mut dy_dt = ModelState::zeros();
        model.calculate_dy_dt(0.0, &ModelState::from(state), &mut dy_dt);

        let rates = model.derivative(&state);
        for compartment in Compartment::ALL {
            assert_eq!(dy_dt[compartment.index()], rates[compartment]);
        }
    }

    #[test]
    fn first_state_is_exactly_initial_state() {
        let params = ModelParameters::new(0.3, 0.1, 0.0, 1000.0);
        let initial = CompartmentState::new(990.0, 10.0, 0.0, 0.0);
        let grid = TimeGrid::linspace(0.0, 10.0, 11).unwrap();

        let trajectory = integrate(&params, &initial, &grid, &SolverOptions::default()).unwrap();
        assert_eq!(trajectory.first(), Some((0.0, &initial)));
        assert_eq!(trajectory.len(), 11);
    }

    #[test]
    fn rejects_initial_state_not_summing_to_population() {
        let params = ModelParameters::new(0.3, 0.1, 0.0, 1000.0);
        let initial = CompartmentState::new(980.0, 10.0, 0.0, 0.0);
        let grid = TimeGrid::linspace(0.0, 10.0, 11).unwrap();

        let err = integrate(&params, &initial, &grid, &SolverOptions::default()).unwrap_err();
        assert_eq!(
            err,
            RSIRDError::InvalidInput(
                "initial compartments sum to 990 but the population is 1000".to_string()
            )
        );
    }

    #[test]
    fn rejects_negative_initial_state() {
        let params = ModelParameters::new(0.3, 0.1, 0.0, 1000.0);
        let initial = CompartmentState::new(1010.0, -10.0, 0.0, 0.0);
        let grid = TimeGrid::linspace(0.0, 10.0, 11).unwrap();

        let err = integrate(&params, &initial, &grid, &SolverOptions::default()).unwrap_err();
        assert!(matches!(err, RSIRDError::InvalidInput(_)));
    }

    #[test]
    fn step_compared_to_fastest_rate() {
        let model = SIRDModel::from_parameters(ModelParameters::new(5.0, 4.0, 0.0, 1000.0));

        assert!(model.step_exceeds_fastest_rate(&SolverOptions::default().with_step_size(10.0)));
        assert!(!model.step_exceeds_fastest_rate(&SolverOptions::default().with_step_size(0.1)));
        assert!(!model.step_exceeds_fastest_rate(
            &SolverOptions::default()
                .with_method(Method::Dopri5)
                .with_step_size(10.0)
        ));

        // Nothing happens, so no step is too large
        let idle = SIRDModel::from_parameters(ModelParameters::new(0.0, 0.0, 0.0, 1000.0));
        assert!(!idle.step_exceeds_fastest_rate(&SolverOptions::default().with_step_size(1e6)));
    }

    #[test]
    fn large_step_is_unstable() {
        // Step far beyond 1 / rate
        let params = ModelParameters::new(5.0, 4.0, 0.0, 1000.0);
        let initial = CompartmentState::new(500.0, 500.0, 0.0, 0.0);
        let grid = TimeGrid::linspace(0.0, 100.0, 11).unwrap();
        let options = SolverOptions::default().with_step_size(10.0);

        let err = integrate(&params, &initial, &grid, &options).unwrap_err();
        match err {
            RSIRDError::NumericalInstability { index, time, .. } => {
                assert_eq!(index, 1);
                assert_eq!(time, 10.0);
            }
            other => panic!("Expected numerical instability, got {:?}", other),
        }
    }
}
