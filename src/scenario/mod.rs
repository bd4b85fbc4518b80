//! Declarative network descriptions.
//!
//! A scenario names its nodes, wires them with `from -> to` edges and carries the run
//! inputs, so a whole simulation can live in one JSON file.

use crate::analysis::topology;
use crate::compute::{DetailedResult, Engine, RunOptions, SimulationError};
use crate::policy::{constant, FlowShape, PolicyRef, Property, ReleaseRule};
use crate::store::{ConfigError, NodeId, Registry};
use crate::units::{Quantity, Unit};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid scenario document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub days: i64,
    pub rainfall: Vec<f64>,
    /// Name of the node whose outflow is reported.
    pub root: String,
    #[serde(default)]
    pub memoize: bool,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    River {
        name: String,
        area: AreaSpec,
        flow_days: f64,
        flow_shape: ShapeSpec,
    },
    Dam {
        name: String,
        out_flow: RuleSpec,
    },
}

/// Water flows from `from` into `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
}

/// A bare number is square kilometres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AreaSpec {
    SquareKilometres(f64),
    WithUnit { value: f64, unit: String },
}

/// A bare number is a flow shape that returns that fraction for every offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeSpec {
    Number(f64),
    Shape(FlowShape),
}

/// A bare number is a fixed daily release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Number(f64),
    Rule(ReleaseRule),
}

impl AreaSpec {
    fn to_quantity(&self, node: &str) -> Result<Quantity, ConfigError> {
        match self {
            AreaSpec::SquareKilometres(v) => Ok(Quantity::from_unit(*v, Unit::SquareKilometre)),
            AreaSpec::WithUnit { value, unit } => Quantity::of(*value, unit).map_err(|source| ConfigError::Unit {
                node: node.to_string(),
                property: "area",
                source,
            }),
        }
    }
}

impl ShapeSpec {
    fn to_policy(&self) -> PolicyRef {
        match self {
            ShapeSpec::Number(v) => constant(*v, Property::FlowShape.arity()),
            ShapeSpec::Shape(shape) => Arc::new(shape.clone()),
        }
    }
}

impl RuleSpec {
    fn to_policy(&self) -> PolicyRef {
        match self {
            RuleSpec::Number(v) => constant(*v, Property::OutFlow.arity()),
            RuleSpec::Rule(rule) => Arc::new(rule.clone()),
        }
    }
}

/// A scenario's nodes and edges, registered and ready to run.
#[derive(Debug, Clone)]
pub struct Network {
    pub registry: Registry,
    pub root: NodeId,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn options(&self) -> RunOptions {
        RunOptions { memoize: self.memoize }
    }

    /// Registers every node in document order, then every edge.
    pub fn build(&self) -> Result<Network, ScenarioError> {
        let mut registry = Registry::new();
        for node in &self.nodes {
            match node {
                NodeSpec::River { name, area, flow_days, flow_shape } => {
                    let area = area.to_quantity(name)?;
                    registry.add_river(name, area, *flow_days, flow_shape.to_policy())?;
                }
                NodeSpec::Dam { name, out_flow } => {
                    registry.add_dam(name, out_flow.to_policy())?;
                }
            }
        }

        let lookup = |name: &str| registry.find(name).ok_or_else(|| ConfigError::UnknownNode(name.to_string()));
        let mut links = Vec::with_capacity(self.edges.len());
        for edge in &self.edges {
            links.push((lookup(&edge.to)?, lookup(&edge.from)?));
        }
        let root = lookup(&self.root)?;
        for (downstream, upstream) in links {
            registry.add_inflow(downstream, upstream)?;
        }

        let feeding = topology::upstream_from(&registry, &[root]);
        for id in registry.node_ids().filter(|id| !feeding.contains(id)) {
            warn!(node = registry.name(id), root = %self.root, "node does not drain into the root and will not be simulated");
        }
        debug!(nodes = registry.count(), edges = self.edges.len(), "scenario network built");

        Ok(Network { registry, root })
    }

    /// Builds the network and simulates it once.
    pub fn run(&self) -> Result<(Network, DetailedResult), ScenarioError> {
        let network = self.build()?;
        let result = Engine::with_options(&network.registry, self.options()).run(
            network.root,
            self.days,
            Some(self.rainfall.as_slice()),
        )?;
        Ok((network, result))
    }
}
