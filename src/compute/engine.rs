//! A synchronous, single-threaded network evaluator.
use crate::compute::kernel;
use crate::compute::ledger::{DetailedResult, NodeOutputs, SimulationError};
use crate::store::{NodeId, NodeKind, Registry};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Reuse a node's outputs when several downstream paths reach it within one run.
    /// Results are identical either way.
    pub memoize: bool,
}

pub struct Engine<'a> {
    registry: &'a Registry,
    options: RunOptions,
}

/// Everything one run mutates. Never shared between runs.
struct RunState<'r> {
    days: usize,
    rainfall: &'r [f64],
    active: HashSet<NodeId>,
    memo: HashMap<NodeId, Rc<NodeOutputs>>,
    result: DetailedResult,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry, options: RunOptions::default() }
    }

    pub fn with_options(registry: &'a Registry, options: RunOptions) -> Self {
        Self { registry, options }
    }

    /// Simulates `days` days of the subnetwork feeding `root`.
    ///
    /// Upstream nodes are evaluated depth-first before their consumers, inflows in
    /// registration order. The result holds every node reached on the way. The run
    /// either completes or fails as a whole.
    pub fn run(&self, root: NodeId, days: i64, rainfall: Option<&[f64]>) -> Result<DetailedResult, SimulationError> {
        let rainfall = rainfall.ok_or_else(|| SimulationError::InvalidArgument("rainfall is required".into()))?;
        if days < 0 {
            return Err(SimulationError::InvalidArgument(format!("days must be non-negative (got {})", days)));
        }
        if !self.registry.contains(root) {
            return Err(SimulationError::InvalidArgument(format!("node {:?} is not part of this network", root)));
        }
        if let Some((i, v)) = rainfall.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(SimulationError::InvalidArgument(format!(
                "rainfall[{}] must be a finite, non-negative depth (got {})",
                i, v
            )));
        }

        debug!(root = self.registry.name(root), days, rain_days = rainfall.len(), "network run started");

        let mut state = RunState {
            days: days as usize,
            rainfall,
            active: HashSet::new(),
            memo: HashMap::new(),
            result: DetailedResult::new(),
        };
        self.evaluate(root, &mut state)?;

        debug!(touched = state.result.total_out_by_node.len(), "network run finished");
        Ok(state.result)
    }

    /// The root's daily outflow. All zeros if the root was never recorded.
    pub fn calculate(&self, root: NodeId, days: i64, rainfall: &[f64]) -> Result<Vec<f64>, SimulationError> {
        let mut result = self.run(root, days, Some(rainfall))?;
        Ok(result
            .total_out_by_node
            .remove(&root)
            .unwrap_or_else(|| vec![0.0; days.max(0) as usize]))
    }

    /// Runs several independent rainfall series through the same network in parallel.
    /// Each run owns its state; the first failure in input order is returned.
    pub fn run_batch(&self, root: NodeId, days: i64, rainfalls: &[Vec<f64>]) -> Result<Vec<DetailedResult>, SimulationError> {
        let runs: Vec<Result<DetailedResult, SimulationError>> = rainfalls
            .par_iter()
            .map(|rainfall| self.run(root, days, Some(rainfall.as_slice())))
            .collect();
        runs.into_iter().collect()
    }

    /// Post-order evaluation. A node is active from entry until its own outputs are
    /// complete; meeting an active node again means the graph loops back on itself.
    fn evaluate(&self, node: NodeId, state: &mut RunState<'_>) -> Result<Rc<NodeOutputs>, SimulationError> {
        if let Some(hit) = state.memo.get(&node) {
            return Ok(Rc::clone(hit));
        }
        let name = self.registry.name(node);
        if !state.active.insert(node) {
            return Err(SimulationError::Cycle { node: name.to_string() });
        }

        let upstream = self
            .registry
            .inflows(node)
            .iter()
            .map(|&up| self.evaluate(up, state))
            .collect::<Result<Vec<_>, _>>()?;

        let mut incoming = kernel::sum_inflows(upstream.iter().map(|o| o.per_edge_out.as_slice()), state.days);

        let (total_out, backlog) = match self.registry.kind(node) {
            NodeKind::River(river) => {
                kernel::add_rainfall(&mut incoming, state.rainfall, &river.area, name)?;
                kernel::route_river(&incoming, river.flow_days, river.flow_shape.as_ref(), name)?
            }
            NodeKind::Dam(dam) => kernel::route_dam(&incoming, dam.out_flow.as_ref(), name)?,
        };
        let per_edge_out = kernel::split(&total_out, self.registry.downstream_count(node));

        let outputs = Rc::new(NodeOutputs { total_out, per_edge_out, backlog });
        state.result.record(node, &outputs);
        state.active.remove(&node);
        trace!(node = name, inflows = upstream.len(), "node evaluated");

        if self.options.memoize {
            state.memo.insert(node, Rc::clone(&outputs));
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{constant, native, FlowShape, PolicyRef, ReleaseRule};
    use crate::units::Quantity;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sqkm(v: f64) -> Quantity { Quantity::of(v, "sqkm").unwrap() }

    fn immediate() -> PolicyRef { Arc::new(FlowShape::Immediate) }

    fn all_series(result: &DetailedResult) -> impl Iterator<Item = &Vec<f64>> {
        result.total_out_by_node.values().chain(result.volume_by_node.values())
    }

    #[test]
    fn test_single_river_scenario() {
        let mut reg = Registry::new();
        let r = reg.add_river("Creek", sqkm(2.0), 1.0, immediate()).unwrap();

        let res = Engine::new(&reg).run(r, 3, Some(&[10.0, 0.0, 5.0])).unwrap();
        assert_eq!(res.total_out(r).unwrap(), &[20.0, 0.0, 10.0]);
        assert_eq!(res.volume(r).unwrap(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dam_fed_by_constant_inflow() {
        // 5 mm over 2 km² delivers 10 ML a day.
        let mut reg = Registry::new();
        let r = reg.add_river("Feed", sqkm(2.0), 1.0, immediate()).unwrap();
        let d = reg.add_dam("Weir", native("cap5", 1, |a| a[0].min(5.0))).unwrap();
        reg.add_inflow(d, r).unwrap();

        let res = Engine::new(&reg).run(d, 3, Some(&[5.0, 5.0, 5.0])).unwrap();
        assert_eq!(res.total_out(r).unwrap(), &[10.0, 10.0, 10.0]);
        assert_eq!(res.total_out(d).unwrap(), &[5.0, 5.0, 5.0]);
        assert_eq!(res.volume(d).unwrap(), &[5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_short_rainfall_counts_as_dry_days() {
        let mut reg = Registry::new();
        let r = reg.add_river("Creek", sqkm(1.0), 1.0, immediate()).unwrap();
        let out = Engine::new(&reg).calculate(r, 4, &[3.0]).unwrap();
        assert_eq!(out, vec![3.0, 0.0, 0.0, 0.0]);

        let out = Engine::new(&reg).calculate(r, 0, &[3.0]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_chain_conserves_volume_without_lag() {
        let mut reg = Registry::new();
        let a = reg.add_river("A", sqkm(1.5), 1.0, immediate()).unwrap();
        let b = reg.add_river("B", sqkm(0.5), 1.0, immediate()).unwrap();
        let c = reg.add_river("C", sqkm(3.0), 1.0, immediate()).unwrap();
        reg.add_inflow(b, a).unwrap();
        reg.add_inflow(c, b).unwrap();

        let rain = [4.0, 0.0, 2.5, 7.0];
        let res = Engine::new(&reg).run(c, 4, Some(&rain)).unwrap();
        let out = res.total_out(c).unwrap();
        for (d, r) in rain.iter().enumerate() {
            let incoming = r * (1.5 + 0.5 + 3.0);
            assert!((out[d] - incoming).abs() < 1e-9, "day {}: {} vs {}", d, out[d], incoming);
        }
        assert_eq!(res.touched().count(), 3);
    }

    #[test]
    fn test_branch_splits_evenly() {
        let mut reg = Registry::new();
        let src = reg.add_river("Source", sqkm(3.0), 1.0, immediate()).unwrap();
        let left = reg.add_dam("Left", Arc::new(ReleaseRule::All)).unwrap();
        let mid = reg.add_dam("Mid", Arc::new(ReleaseRule::All)).unwrap();
        let right = reg.add_dam("Right", Arc::new(ReleaseRule::All)).unwrap();
        for d in [left, mid, right] {
            reg.add_inflow(d, src).unwrap();
        }

        let engine = Engine::new(&reg);
        let rain = [2.0, 1.0];
        let total = engine.calculate(src, 2, &rain).unwrap();
        let mut recombined = vec![0.0; 2];
        for d in [left, mid, right] {
            let got = engine.calculate(d, 2, &rain).unwrap();
            for day in 0..2 {
                assert!((got[day] - total[day] / 3.0).abs() < 1e-12);
                recombined[day] += got[day];
            }
        }
        for day in 0..2 {
            assert!((recombined[day] - total[day]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_diamond_is_deterministic_with_and_without_memo() {
        //      Top
        //     /   \
        //   Left  Right
        //     \   /
        //     Outlet
        let mut reg = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let top = reg
            .add_river("Top", sqkm(4.0), 2.0, native("counted", 2, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                0.5
            }))
            .unwrap();
        let left = reg.add_dam("Left", native("half", 1, |a| a[0] * 0.5)).unwrap();
        let right = reg.add_river("Right", sqkm(1.0), 1.0, immediate()).unwrap();
        let outlet = reg.add_dam("Outlet", Arc::new(ReleaseRule::All)).unwrap();
        reg.add_inflow(left, top).unwrap();
        reg.add_inflow(right, top).unwrap();
        reg.add_inflow(outlet, left).unwrap();
        reg.add_inflow(outlet, right).unwrap();

        let rain = [10.0, 0.0, 0.0, 6.0];
        let plain = Engine::new(&reg).run(outlet, 4, Some(&rain)).unwrap();
        let plain_calls = calls.swap(0, Ordering::SeqCst);

        let memo = Engine::with_options(&reg, RunOptions { memoize: true })
            .run(outlet, 4, Some(&rain))
            .unwrap();
        let memo_calls = calls.load(Ordering::SeqCst);

        assert_eq!(plain, memo);
        assert_eq!(plain_calls, 2 * memo_calls);
        assert_eq!(plain.touched().collect::<Vec<_>>(), vec![top, left, right, outlet]);
    }

    #[rstest]
    #[case::from_a(0)]
    #[case::from_b(1)]
    fn test_two_node_cycle_is_reported(#[case] start: u32) {
        let mut reg = Registry::new();
        let a = reg.add_river("A", sqkm(1.0), 1.0, immediate()).unwrap();
        let b = reg.add_dam("B", constant(0.0, 1)).unwrap();
        reg.add_inflow(b, a).unwrap();
        reg.add_inflow(a, b).unwrap();

        let err = Engine::new(&reg).run(NodeId(start), 3, Some(&[1.0])).unwrap_err();
        match err {
            SimulationError::Cycle { node } => assert!(node == "A" || node == "B", "got {}", node),
            other => panic!("Wrong error type: {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut reg = Registry::new();
        let a = reg.add_dam("Loop", constant(1.0, 1)).unwrap();
        reg.add_inflow(a, a).unwrap();
        let err = Engine::new(&reg).run(a, 1, Some(&[])).unwrap_err();
        assert_eq!(err, SimulationError::Cycle { node: "Loop".into() });
    }

    #[test]
    fn test_cycle_detected_with_memo_enabled() {
        let mut reg = Registry::new();
        let a = reg.add_dam("A", constant(1.0, 1)).unwrap();
        let b = reg.add_dam("B", constant(1.0, 1)).unwrap();
        let c = reg.add_dam("C", constant(1.0, 1)).unwrap();
        reg.add_inflow(c, b).unwrap();
        reg.add_inflow(b, a).unwrap();
        reg.add_inflow(a, c).unwrap();

        let engine = Engine::with_options(&reg, RunOptions { memoize: true });
        assert!(matches!(engine.run(c, 2, Some(&[])), Err(SimulationError::Cycle { .. })));
    }

    #[test]
    fn test_argument_errors() {
        let mut reg = Registry::new();
        let r = reg.add_river("R", sqkm(1.0), 1.0, immediate()).unwrap();
        let engine = Engine::new(&reg);

        assert!(matches!(engine.run(r, 3, None), Err(SimulationError::InvalidArgument(_))));
        assert!(matches!(engine.run(r, -1, Some(&[])), Err(SimulationError::InvalidArgument(_))));
        assert!(matches!(engine.run(NodeId(9), 1, Some(&[])), Err(SimulationError::InvalidArgument(_))));
        assert!(matches!(engine.run(r, 2, Some(&[1.0, -2.0])), Err(SimulationError::InvalidArgument(_))));
        assert!(matches!(engine.run(r, 2, Some(&[f64::NAN])), Err(SimulationError::InvalidArgument(_))));
    }

    #[test]
    fn test_policy_error_aborts_whole_run() {
        let mut reg = Registry::new();
        let up = reg
            .add_river("Up", sqkm(1.0), 1.0, crate::policy::host_fn("nil", 2, |_| Ok(crate::policy::HostValue::Nil)))
            .unwrap();
        let down = reg.add_dam("Down", Arc::new(ReleaseRule::All)).unwrap();
        reg.add_inflow(down, up).unwrap();

        let err = Engine::new(&reg).run(down, 2, Some(&[1.0])).unwrap_err();
        assert_eq!(err.to_string(), "Property 'flow_shape' of 'Up' must return a number (got nil)");
    }

    #[test]
    fn test_outputs_never_negative() {
        let mut reg = Registry::new();
        let wild = native("wild", 2, |a| if a[0] == 0.0 { 1.7 } else { -0.4 });
        let r = reg.add_river("Wild", sqkm(2.0), 3.5, wild).unwrap();
        let d = reg.add_dam("Greedy", native("over", 1, |a| a[0] * 3.0 - 1.0)).unwrap();
        let s = reg.add_dam("Sink", native("neg", 1, |_| -10.0)).unwrap();
        reg.add_inflow(d, r).unwrap();
        reg.add_inflow(s, d).unwrap();

        let res = Engine::new(&reg).run(s, 6, Some(&[3.0, 0.0, 9.0, 1.0])).unwrap();
        assert_eq!(res.touched().count(), 3);
        for series in all_series(&res) {
            assert_eq!(series.len(), 6);
            assert!(series.iter().all(|v| *v >= 0.0), "{:?}", series);
        }
    }

    #[test]
    fn test_run_batch_matches_sequential_runs() {
        let mut reg = Registry::new();
        let r = reg.add_river("R", sqkm(2.0), 2.0, Arc::new(FlowShape::Uniform)).unwrap();
        let d = reg.add_dam("D", Arc::new(ReleaseRule::Fraction { ratio: 0.5 })).unwrap();
        reg.add_inflow(d, r).unwrap();

        let rains = vec![vec![1.0, 2.0], vec![0.0, 0.0, 8.0], vec![]];
        let engine = Engine::new(&reg);
        let batch = engine.run_batch(d, 4, &rains).unwrap();
        assert_eq!(batch.len(), 3);
        for (rain, got) in rains.iter().zip(&batch) {
            assert_eq!(got, &engine.run(d, 4, Some(rain.as_slice())).unwrap());
        }

        let bad = vec![vec![1.0], vec![-1.0]];
        assert!(engine.run_batch(d, 4, &bad).is_err());
    }
}
