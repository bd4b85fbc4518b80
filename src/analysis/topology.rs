use crate::compute::SimulationError;
use crate::store::{NodeId, Registry};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashSet, VecDeque};

/// The order in which a run from `root` completes its nodes: every inflow before its
/// consumer, inflows in registration order, each node once.
///
/// Uses the same DFS as the engine, so a cycle reachable from `root` is reported on
/// the node where the walk closes it.
pub fn evaluation_order(registry: &Registry, root: NodeId) -> Result<Vec<NodeId>, SimulationError> {
    let count = registry.count();
    if !registry.contains(root) {
        return Err(SimulationError::InvalidArgument(format!("node {:?} is not part of this network", root)));
    }
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];
    visit(root, registry, &mut state, &mut order)?;
    Ok(order)
}

#[derive(Clone, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // Used for cycle detection
    Visited,
}

fn visit(
    node: NodeId,
    registry: &Registry,
    state: &mut Vec<VisitState>,
    order: &mut Vec<NodeId>,
) -> Result<(), SimulationError> {
    let idx = node.index();

    match state[idx] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => return Err(SimulationError::Cycle { node: registry.name(node).to_string() }),
        VisitState::None => state[idx] = VisitState::Visiting,
    }

    for &upstream in registry.inflows(node) {
        visit(upstream, registry, state, order)?;
    }

    state[idx] = VisitState::Visited;
    order.push(node);
    Ok(())
}

/// Every node whose water can reach one of `roots`, roots included.
pub fn upstream_from(registry: &Registry, roots: &[NodeId]) -> HashSet<NodeId> {
    walk(roots, |n| registry.inflows(n))
}

/// Every node that receives water from one of `start_nodes`, the starts included.
pub fn downstream_from(registry: &Registry, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    walk(start_nodes, |n| registry.outflows(n))
}

fn walk<'r>(start: &[NodeId], next: impl Fn(NodeId) -> &'r [NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(next(node).iter().copied());
        }
    }
    visited
}

/// Scans the whole network for loops without running it.
///
/// Returns one group per strongly connected component that actually cycles (two or
/// more nodes, or a single node feeding itself). Each group is sorted by id and the
/// groups are ordered by their first member.
pub fn find_cycles(registry: &Registry) -> Vec<Vec<NodeId>> {
    let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(registry.count(), 0);
    for id in registry.node_ids() {
        graph.add_node(id);
    }
    for id in registry.node_ids() {
        for &up in registry.inflows(id) {
            graph.add_edge(NodeIndex::new(up.index()), NodeIndex::new(id.index()), ());
        }
    }

    let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<NodeId> = scc.into_iter().map(|ix| graph[ix]).collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::constant;

    fn dam(reg: &mut Registry, name: &str) -> NodeId {
        reg.add_dam(name, constant(0.0, 1)).unwrap()
    }

    #[test]
    fn test_order_diamond_dependency() {
        // Shape: A -> B, A -> C, B+C -> D
        let mut reg = Registry::new();
        let a = dam(&mut reg, "A");
        let b = dam(&mut reg, "B");
        let c = dam(&mut reg, "C");
        let d = dam(&mut reg, "D");
        reg.add_inflow(b, a).unwrap();
        reg.add_inflow(c, a).unwrap();
        reg.add_inflow(d, b).unwrap();
        reg.add_inflow(d, c).unwrap();

        let res = evaluation_order(&reg, d).expect("Order failed");
        assert_eq!(res, vec![a, b, c, d]);
    }

    #[test]
    fn test_order_skips_unrelated_nodes() {
        let mut reg = Registry::new();
        let a = dam(&mut reg, "A");
        let _lonely = dam(&mut reg, "Lonely");
        let b = dam(&mut reg, "B");
        reg.add_inflow(b, a).unwrap();

        assert_eq!(evaluation_order(&reg, b).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_order_reports_cycle() {
        let mut reg = Registry::new();
        let a = dam(&mut reg, "A");
        let b = dam(&mut reg, "B");
        reg.add_inflow(b, a).unwrap();
        reg.add_inflow(a, b).unwrap();

        let err = evaluation_order(&reg, b).unwrap_err();
        assert!(err.to_string().contains("Cycle detected"), "Msg: {}", err);
    }

    #[test]
    fn test_upstream_and_downstream_reach() {
        let mut reg = Registry::new();
        let a = dam(&mut reg, "A");
        let b = dam(&mut reg, "B");
        let c = dam(&mut reg, "C");
        let side = dam(&mut reg, "Side");
        reg.add_inflow(b, a).unwrap();
        reg.add_inflow(c, b).unwrap();
        reg.add_inflow(side, a).unwrap();

        assert_eq!(upstream_from(&reg, &[c]), HashSet::from([a, b, c]));
        assert_eq!(downstream_from(&reg, &[a]), HashSet::from([a, b, c, side]));
        assert_eq!(downstream_from(&reg, &[side]), HashSet::from([side]));
    }

    #[test]
    fn test_find_cycles() {
        let mut reg = Registry::new();
        let a = dam(&mut reg, "A");
        let b = dam(&mut reg, "B");
        let c = dam(&mut reg, "C");
        let selfish = dam(&mut reg, "Selfish");
        let tail = dam(&mut reg, "Tail");
        reg.add_inflow(b, a).unwrap();
        reg.add_inflow(c, b).unwrap();
        reg.add_inflow(a, c).unwrap();
        reg.add_inflow(selfish, selfish).unwrap();
        reg.add_inflow(tail, c).unwrap();

        assert_eq!(find_cycles(&reg), vec![vec![a, b, c], vec![selfish]]);
    }

    #[test]
    fn test_find_cycles_on_acyclic_network() {
        let mut reg = Registry::new();
        let a = dam(&mut reg, "A");
        let b = dam(&mut reg, "B");
        reg.add_inflow(b, a).unwrap();
        assert!(find_cycles(&reg).is_empty());
    }
}
