use crate::policy::PolicyRef;
use crate::units::Quantity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    /// `None` when `idx` does not fit a handle.
    pub fn new(idx: usize) -> Option<Self> { u32::try_from(idx).ok().map(Self) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMetadata {
    pub name: String,
}

/// Catchment area of a river: fixed, or computed per simulated day by a callable
/// invoked as `(day)` whose result is in square kilometres.
#[derive(Debug, Clone)]
pub enum AreaSource {
    Fixed(Quantity),
    Dynamic(PolicyRef),
}

impl From<Quantity> for AreaSource {
    fn from(q: Quantity) -> Self { AreaSource::Fixed(q) }
}

#[derive(Debug, Clone)]
pub struct RiverParams {
    pub area: AreaSource,
    /// How many days a pulse takes to leave the river. May be fractional.
    pub flow_days: f64,
    /// `(offset, flow_days) -> fraction`
    pub flow_shape: PolicyRef,
}

#[derive(Debug, Clone)]
pub struct DamParams {
    /// `(current_volume) -> release`
    pub out_flow: PolicyRef,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    River(RiverParams),
    Dam(DamParams),
}

impl NodeKind {
    pub fn is_river(&self) -> bool { matches!(self, NodeKind::River(_)) }

    /// One-letter tag used in tree diagrams.
    pub fn tag(&self) -> char {
        match self {
            NodeKind::River(_) => 'R',
            NodeKind::Dam(_) => 'D',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_rejects_out_of_range_index() {
        assert_eq!(NodeId::new(3), Some(NodeId(3)));
        assert_eq!(NodeId::new(u32::MAX as usize), Some(NodeId(u32::MAX)));
        assert_eq!(NodeId::new(1usize << 32), None);
        assert_eq!(NodeId::new(usize::MAX), None);
    }
}
