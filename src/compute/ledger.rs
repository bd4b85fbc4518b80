use crate::policy::Property;
use crate::store::{NodeId, Registry};
use crate::units::UnitError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Cycle detected in network at '{node}'")]
    Cycle { node: String },
    #[error("Property '{property}' of '{node}' must return a number (got {found})")]
    PolicyEvaluation { node: String, property: Property, found: &'static str },
    #[error("Property '{property}' of '{node}' failed: {message}")]
    HostFailure { node: String, property: Property, message: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// One node's series for a single run. All values are megalitres per day.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeOutputs {
    /// Daily outflow before splitting across downstream edges.
    pub total_out: Vec<f64>,
    /// What each single downstream edge receives.
    pub per_edge_out: Vec<f64>,
    /// End-of-day volume stored or still in transit.
    pub backlog: Vec<f64>,
}

/// Run-level aggregate covering every node touched while evaluating the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailedResult {
    pub total_out_by_node: BTreeMap<NodeId, Vec<f64>>,
    pub volume_by_node: BTreeMap<NodeId, Vec<f64>>,
}

impl DetailedResult {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn record(&mut self, node: NodeId, outputs: &NodeOutputs) {
        self.total_out_by_node.insert(node, outputs.total_out.clone());
        self.volume_by_node.insert(node, outputs.backlog.clone());
    }

    pub fn total_out(&self, node: NodeId) -> Option<&[f64]> {
        self.total_out_by_node.get(&node).map(Vec::as_slice)
    }

    pub fn volume(&self, node: NodeId) -> Option<&[f64]> {
        self.volume_by_node.get(&node).map(Vec::as_slice)
    }

    pub fn touched(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.total_out_by_node.keys().copied()
    }

    /// Re-keys the series by node name for export.
    pub fn to_named(&self, registry: &Registry) -> BTreeMap<String, NamedSeries> {
        self.touched()
            .map(|id| {
                let series = NamedSeries {
                    kind: if registry.kind(id).is_river() { "river" } else { "dam" },
                    outflow: self.total_out_by_node[&id].clone(),
                    storage: self.volume_by_node.get(&id).cloned().unwrap_or_default(),
                };
                (registry.name(id).to_string(), series)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub kind: &'static str,
    pub outflow: Vec<f64>,
    pub storage: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Engine;
    use crate::policy::{constant, FlowShape};
    use crate::units::Quantity;
    use std::sync::Arc;

    #[test]
    fn test_to_named_keys_series_by_name() {
        let mut reg = Registry::new();
        let creek = reg
            .add_river("Creek", Quantity::of(2.0, "sqkm").unwrap(), 1.0, Arc::new(FlowShape::Immediate))
            .unwrap();
        let pond = reg.add_dam("Pond", constant(5.0, 1)).unwrap();
        reg.add_dam("Unreached", constant(0.0, 1)).unwrap();
        reg.add_inflow(pond, creek).unwrap();

        let result = Engine::new(&reg).run(pond, 2, Some(&[10.0])).unwrap();
        let named = result.to_named(&reg);

        assert_eq!(named.keys().map(String::as_str).collect::<Vec<_>>(), vec!["Creek", "Pond"]);
        assert_eq!(
            named["Creek"],
            NamedSeries { kind: "river", outflow: vec![20.0, 0.0], storage: vec![0.0, 0.0] }
        );
        assert_eq!(
            named["Pond"],
            NamedSeries { kind: "dam", outflow: vec![5.0, 5.0], storage: vec![15.0, 10.0] }
        );

        let json = serde_json::to_value(&named).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Creek": {"kind": "river", "outflow": [20.0, 0.0], "storage": [0.0, 0.0]},
                "Pond": {"kind": "dam", "outflow": [5.0, 5.0], "storage": [15.0, 10.0]},
            })
        );
    }

    #[test]
    fn test_to_named_missing_storage_is_empty() {
        let mut reg = Registry::new();
        let lake = reg.add_dam("Lake", constant(0.0, 1)).unwrap();
        let mut result = DetailedResult::new();
        result.total_out_by_node.insert(lake, vec![1.0]);

        let named = result.to_named(&reg);
        assert_eq!(named["Lake"], NamedSeries { kind: "dam", outflow: vec![1.0], storage: vec![] });
    }
}
