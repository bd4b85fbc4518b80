//! Daily simulation of rainfall moving through networks of rivers and dams.
//!
//! Nodes live in a [`store::Registry`] and are wired upstream-to-downstream with
//! [`store::Registry::add_inflow`]. [`compute::Engine`] walks the network feeding a
//! chosen root and produces per-node outflow and storage series in megalitres.

pub mod analysis;
pub mod bindings;
pub mod compute;
pub mod display;
pub mod policy;
pub mod scenario;
pub mod store;
pub mod units;

pub use compute::{DetailedResult, Engine, RunOptions, SimulationError};
pub use policy::{Callable, FlowShape, HostError, HostValue, PolicyRef, ReleaseRule};
pub use scenario::{Scenario, ScenarioError};
pub use store::{AreaSource, ConfigError, NodeId, Registry};
pub use units::{Kind, Quantity, Unit, UnitError};

// FFI Facade: the entry point for Python.
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Confirms the Rust core is callable from Python.
#[cfg(feature = "python")]
#[pyfunction]
fn rust_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// The `catchment._core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(rust_core_version, m)?)?;
    m.add_class::<bindings::python::PyNetwork>()?;
    Ok(())
}
