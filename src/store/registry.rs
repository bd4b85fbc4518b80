use super::error::ConfigError;
use super::types::*;
use crate::policy::{PolicyRef, Property};
use crate::units::Kind;
use smallvec::SmallVec;
use std::collections::HashMap;

type Adjacency = SmallVec<[NodeId; 4]>;

/// Owns every node of a network. Nodes are addressed by `NodeId` handles, so the graph
/// may contain cycles as data without any ownership cycle.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Columnar Arrays
    kinds: Vec<NodeKind>,
    meta: Vec<NodeMetadata>,

    // Topology: inflows in registration order, plus the reciprocal back-links.
    inflows: Vec<Adjacency>,
    outflows: Vec<Adjacency>,

    names: HashMap<String, NodeId>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }
    pub fn contains(&self, id: NodeId) -> bool { id.index() < self.kinds.len() }

    /// The handle at `index`, if this network has a node there.
    pub fn handle(&self, index: usize) -> Option<NodeId> {
        NodeId::new(index).filter(|&id| self.contains(id))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.count()).filter_map(NodeId::new)
    }

    pub fn add_river(
        &mut self,
        name: &str,
        area: impl Into<AreaSource>,
        flow_days: f64,
        flow_shape: PolicyRef,
    ) -> Result<NodeId, ConfigError> {
        self.check_name(name)?;
        let area = area.into();
        match &area {
            AreaSource::Fixed(q) => {
                q.expect_kind(Kind::Area).map_err(|source| ConfigError::Unit {
                    node: name.to_string(),
                    property: "area",
                    source,
                })?;
                if !q.canonical_value().is_finite() || q.canonical_value() < 0.0 {
                    return Err(ConfigError::InvalidParameter {
                        node: name.to_string(),
                        property: "area",
                        reason: format!("must be a finite, non-negative area (got {})", q),
                    });
                }
            }
            AreaSource::Dynamic(f) => check_arity(name, Property::Area, f)?,
        }
        if !flow_days.is_finite() || flow_days < 0.0 {
            return Err(ConfigError::InvalidParameter {
                node: name.to_string(),
                property: "flow_days",
                reason: format!("must be a finite, non-negative number of days (got {})", flow_days),
            });
        }
        check_arity(name, Property::FlowShape, &flow_shape)?;

        self.push_node(name, NodeKind::River(RiverParams { area, flow_days, flow_shape }))
    }

    pub fn add_dam(&mut self, name: &str, out_flow: PolicyRef) -> Result<NodeId, ConfigError> {
        self.check_name(name)?;
        check_arity(name, Property::OutFlow, &out_flow)?;
        self.push_node(name, NodeKind::Dam(DamParams { out_flow }))
    }

    /// Registers `upstream` as feeding `downstream`, and `downstream` as a consumer of
    /// `upstream`. Self-loops and cycles are accepted; evaluation reports them.
    pub fn add_inflow(&mut self, downstream: NodeId, upstream: NodeId) -> Result<(), ConfigError> {
        for id in [downstream, upstream] {
            if !self.contains(id) {
                return Err(ConfigError::MissingNode(id));
            }
        }
        self.inflows[downstream.index()].push(upstream);
        self.outflows[upstream.index()].push(downstream);
        Ok(())
    }

    #[inline(always)]
    pub fn inflows(&self, id: NodeId) -> &[NodeId] { &self.inflows[id.index()] }

    #[inline(always)]
    pub fn outflows(&self, id: NodeId) -> &[NodeId] { &self.outflows[id.index()] }

    pub fn downstream_count(&self, id: NodeId) -> usize { self.outflows[id.index()].len() }

    pub fn kind(&self, id: NodeId) -> &NodeKind { &self.kinds[id.index()] }

    pub fn name(&self, id: NodeId) -> &str { &self.meta[id.index()].name }

    pub fn find(&self, name: &str) -> Option<NodeId> { self.names.get(name).copied() }

    fn check_name(&self, name: &str) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                node: name.to_string(),
                property: "name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.names.contains_key(name) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn push_node(&mut self, name: &str, kind: NodeKind) -> Result<NodeId, ConfigError> {
        let id = NodeId::new(self.kinds.len()).ok_or(ConfigError::Full(self.kinds.len()))?;
        self.kinds.push(kind);
        self.meta.push(NodeMetadata { name: name.to_string() });
        self.inflows.push(Adjacency::new());
        self.outflows.push(Adjacency::new());
        self.names.insert(name.to_string(), id);
        Ok(id)
    }
}

fn check_arity(node: &str, property: Property, policy: &PolicyRef) -> Result<(), ConfigError> {
    let found = policy.arity();
    if found != property.arity() {
        return Err(ConfigError::WrongArity {
            node: node.to_string(),
            property,
            expected: property.arity(),
            found,
        });
    }
    Ok(())
}
