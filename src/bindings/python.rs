use crate::analysis::topology;
use crate::compute::{Engine, RunOptions, SimulationError};
use crate::display::{render_report, render_tree};
use crate::policy::{constant, Callable, HostError, HostValue, PolicyRef, Property};
use crate::store::{AreaSource, ConfigError, NodeId, Registry};
use crate::units::Quantity;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyString};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A Python callable seen through the engine's policy interface.
#[derive(Debug)]
struct PyPolicy {
    func: Py<PyAny>,
    arity: usize,
    name: String,
}

impl Callable for PyPolicy {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, args: &[f64]) -> Result<HostValue, HostError> {
        Python::attach(|py| {
            let args = pyo3::types::PyTuple::new(py, args.iter().copied()).map_err(|e| HostError::new(e.to_string()))?;
            let value = self.func.bind(py).call1(args).map_err(|e| HostError::new(e.to_string()))?;
            Ok(to_host_value(&value))
        })
    }

    fn describe(&self) -> String {
        format!("<fn {}>", self.name)
    }
}

fn to_host_value(value: &Bound<'_, PyAny>) -> HostValue {
    if value.is_none() {
        HostValue::Nil
    } else if value.is_instance_of::<PyBool>() {
        HostValue::Bool(value.is_truthy().unwrap_or(false))
    } else if value.is_instance_of::<PyString>() {
        HostValue::Text(value.extract::<String>().unwrap_or_default())
    } else if let Ok(v) = value.extract::<f64>() {
        HostValue::Number(v)
    } else {
        let type_name = value.get_type().name().map(|n| n.to_string()).unwrap_or_default();
        HostValue::Other(type_name)
    }
}

/// Numbers become constants; anything callable is wrapped as-is with its arity taken
/// from its signature when Python can report one.
fn to_policy(py: Python<'_>, value: &Bound<'_, PyAny>, node: &str, property: Property) -> PyResult<PolicyRef> {
    if !value.is_instance_of::<PyBool>() {
        if let Ok(v) = value.extract::<f64>() {
            return Ok(constant(v, property.arity()));
        }
    }
    if !value.is_callable() {
        return Err(PyValueError::new_err(format!(
            "Property '{}' of '{}' must be a number or a function",
            property, node
        )));
    }

    let arity = py
        .import("inspect")
        .and_then(|inspect| inspect.call_method1("signature", (value,)))
        .and_then(|sig| sig.getattr("parameters"))
        .and_then(|params| params.len())
        .unwrap_or_else(|_| property.arity());
    let name = value
        .getattr("__name__")
        .and_then(|n| n.extract::<String>())
        .unwrap_or_else(|_| property.name().to_string());

    Ok(Arc::new(PyPolicy { func: value.clone().unbind(), arity, name }))
}

fn config_err(e: ConfigError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn sim_err(e: SimulationError) -> PyErr {
    match e {
        SimulationError::InvalidArgument(_) => PyValueError::new_err(e.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

#[pyclass(name = "_Network")]
#[derive(Debug, Clone, Default)]
pub struct PyNetwork {
    registry: Registry,
}

impl PyNetwork {
    fn node(&self, id: usize) -> PyResult<NodeId> {
        self.registry.handle(id).ok_or_else(|| PyValueError::new_err("Invalid Node ID"))
    }
}

#[pymethods]
impl PyNetwork {
    #[new]
    pub fn new() -> Self { Self::default() }

    /// `area` is a number in `unit` or a function of the day index returning km².
    #[pyo3(signature = (name, area, flow_days, flow_shape, unit = "sqkm"))]
    pub fn add_river(
        &mut self,
        py: Python<'_>,
        name: &str,
        area: &Bound<'_, PyAny>,
        flow_days: f64,
        flow_shape: &Bound<'_, PyAny>,
        unit: &str,
    ) -> PyResult<usize> {
        let area = match area.extract::<f64>() {
            Ok(v) if !area.is_instance_of::<PyBool>() => {
                let q = Quantity::of(v, unit).map_err(|e| PyValueError::new_err(e.to_string()))?;
                AreaSource::Fixed(q)
            }
            _ => AreaSource::Dynamic(to_policy(py, area, name, Property::Area)?),
        };
        let shape = to_policy(py, flow_shape, name, Property::FlowShape)?;
        self.registry
            .add_river(name, area, flow_days, shape)
            .map(|id| id.index())
            .map_err(config_err)
    }

    pub fn add_dam(&mut self, py: Python<'_>, name: &str, out_flow: &Bound<'_, PyAny>) -> PyResult<usize> {
        let policy = to_policy(py, out_flow, name, Property::OutFlow)?;
        self.registry.add_dam(name, policy).map(|id| id.index()).map_err(config_err)
    }

    pub fn add_inflow(&mut self, downstream: usize, upstream: usize) -> PyResult<()> {
        let (downstream, upstream) = (self.node(downstream)?, self.node(upstream)?);
        self.registry.add_inflow(downstream, upstream).map_err(config_err)
    }

    pub fn calculate(&self, root: usize, days: i64, rainfall: Vec<f64>) -> PyResult<Vec<f64>> {
        Engine::new(&self.registry).calculate(self.node(root)?, days, &rainfall).map_err(sim_err)
    }

    /// Returns `(outflow_by_name, storage_by_name)` for every node the run touched.
    #[pyo3(signature = (root, days, rainfall, memoize = false))]
    pub fn run(
        &self,
        root: usize,
        days: i64,
        rainfall: Vec<f64>,
        memoize: bool,
    ) -> PyResult<(BTreeMap<String, Vec<f64>>, BTreeMap<String, Vec<f64>>)> {
        let result = Engine::with_options(&self.registry, RunOptions { memoize })
            .run(self.node(root)?, days, Some(rainfall.as_slice()))
            .map_err(sim_err)?;
        let mut outflow = BTreeMap::new();
        let mut storage = BTreeMap::new();
        for (name, series) in result.to_named(&self.registry) {
            outflow.insert(name.clone(), series.outflow);
            storage.insert(name, series.storage);
        }
        Ok((outflow, storage))
    }

    pub fn report(&self, root: usize, days: i64, rainfall: Vec<f64>) -> PyResult<String> {
        let root = self.node(root)?;
        let result = Engine::new(&self.registry).run(root, days, Some(rainfall.as_slice())).map_err(sim_err)?;
        Ok(render_report(&result, &self.registry, root, days.max(0) as usize))
    }

    pub fn tree(&self, root: usize) -> PyResult<String> {
        Ok(render_tree(&self.registry, self.node(root)?))
    }

    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        topology::find_cycles(&self.registry)
            .into_iter()
            .map(|group| group.into_iter().map(|id| self.registry.name(id).to_string()).collect())
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.registry.find(name).map(|id| id.index())
    }

    pub fn node_count(&self) -> usize { self.registry.count() }
}
