//! Python bindings
//!
//! Exposes the rate equations and the integrator to Python as `rsird._lib`. Trajectories
//! are returned as numpy arrays, ready for plotting.

use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use rsird_components::{
    Compartment, CompartmentColumns, CompartmentState, ModelParameters, SIRDModel,
};
use rsird_core::errors::RSIRDError;
use rsird_core::solver::{Method, SolverOptions};
use rsird_core::timeseries::{FloatValue, TimeGrid};

type PyTrajectory<'py> = (
    Bound<'py, PyArray1<FloatValue>>,
    Bound<'py, PyArray1<FloatValue>>,
    Bound<'py, PyArray1<FloatValue>>,
    Bound<'py, PyArray1<FloatValue>>,
    Bound<'py, PyArray1<FloatValue>>,
);

fn to_py_err(err: RSIRDError) -> PyErr {
    match err {
        RSIRDError::InvalidInput(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Rate of change of `[S, I, R, D]`
#[pyfunction]
#[pyo3(name = "derivative")]
fn py_derivative(
    state: [FloatValue; 4],
    beta: FloatValue,
    gamma: FloatValue,
    theta: FloatValue,
    population: FloatValue,
) -> PyResult<[FloatValue; 4]> {
    let parameters = ModelParameters::new(beta, gamma, theta, population);
    parameters.validate().map_err(to_py_err)?;

    let model = SIRDModel::from_parameters(parameters);
    Ok(model.derivative(&CompartmentState::from(state)).to_array())
}

/// Integrate the model from `initial_state` (`[S, I, R, D]`) over the times `t`.
///
/// Returns `(t, S, I, R, D)`.
#[pyfunction]
#[pyo3(name = "integrate")]
#[pyo3(signature = (initial_state, t, beta, gamma, theta, population, method="rk4", step_size=0.1))]
#[allow(clippy::too_many_arguments)]
fn py_integrate<'py>(
    py: Python<'py>,
    initial_state: [FloatValue; 4],
    t: PyReadonlyArray1<'py, FloatValue>,
    beta: FloatValue,
    gamma: FloatValue,
    theta: FloatValue,
    population: FloatValue,
    method: &str,
    step_size: FloatValue,
) -> PyResult<PyTrajectory<'py>> {
    let method: Method = method.parse().map_err(to_py_err)?;
    let options = SolverOptions::default()
        .with_method(method)
        .with_step_size(step_size);
    let time_grid = TimeGrid::new(t.as_array().to_owned()).map_err(to_py_err)?;
    let model = SIRDModel::from_parameters(ModelParameters::new(beta, gamma, theta, population));

    let trajectory = model
        .integrate(&CompartmentState::from(initial_state), &time_grid, &options)
        .map_err(to_py_err)?;

    let column =
        |c: Compartment| PyArray1::from_owned_array_bound(py, trajectory.column(c));
    Ok((
        PyArray1::from_vec_bound(py, trajectory.times().to_vec()),
        column(Compartment::Susceptible),
        column(Compartment::Infected),
        column(Compartment::Recovered),
        column(Compartment::Deceased),
    ))
}

#[pymodule]
#[pyo3(name = "_lib")]
fn rsird(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(py_derivative, m)?)?;
    m.add_function(wrap_pyfunction!(py_integrate, m)?)?;
    Ok(())
}
