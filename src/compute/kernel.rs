//! Daily transforms for each node kind. Every function here is a pure function of its
//! inputs and the node's policies; all per-day state lives on the stack of one call.

use crate::compute::ledger::SimulationError;
use crate::policy::{Callable, HostValue, Property};
use crate::store::AreaSource;
use tracing::warn;

/// Invokes a policy and reduces its result to a finite number. Non-finite numbers are
/// treated as zero; anything that is not a number aborts the run.
pub(crate) fn evaluate_policy(
    policy: &dyn Callable,
    args: &[f64],
    node: &str,
    property: Property,
) -> Result<f64, SimulationError> {
    match policy.call(args) {
        Ok(HostValue::Number(v)) if v.is_finite() => Ok(v),
        Ok(HostValue::Number(v)) => {
            warn!(node, property = property.name(), value = %v, "non-finite policy result treated as zero");
            Ok(0.0)
        }
        Ok(other) => Err(SimulationError::PolicyEvaluation {
            node: node.to_string(),
            property,
            found: other.type_name(),
        }),
        Err(e) => Err(SimulationError::HostFailure {
            node: node.to_string(),
            property,
            message: e.to_string(),
        }),
    }
}

/// Sums per-edge upstream series day by day. Days past a series' end contribute zero.
pub(crate) fn sum_inflows<'a>(upstream: impl IntoIterator<Item = &'a [f64]>, days: usize) -> Vec<f64> {
    let mut incoming = vec![0.0; days];
    for series in upstream {
        for (slot, v) in incoming.iter_mut().zip(series) {
            *slot += *v;
        }
    }
    incoming
}

/// Adds local rainfall over the river's catchment. 1 mm over 1 km² is 1 ML.
pub(crate) fn add_rainfall(
    incoming: &mut [f64],
    rainfall: &[f64],
    area: &AreaSource,
    node: &str,
) -> Result<(), SimulationError> {
    for (day, (slot, rain_mm)) in incoming.iter_mut().zip(rainfall).enumerate() {
        let area_sqkm = match area {
            AreaSource::Fixed(q) => q.canonical_value(),
            AreaSource::Dynamic(f) => evaluate_policy(f.as_ref(), &[day as f64], node, Property::Area)?.max(0.0),
        };
        *slot += rain_mm * area_sqkm;
    }
    Ok(())
}

/// Spreads each day's incoming pulse over the following `ceil(flow_days)` days using the
/// flow shape. Returns `(total_out, backlog)`.
///
/// Shares landing past the horizon are dropped and never counted as backlog. The shape's
/// fractions are clamped to [0, 1] and their running total for one pulse is capped at 1.
pub(crate) fn route_river(
    incoming: &[f64],
    flow_days: f64,
    flow_shape: &dyn Callable,
    node: &str,
) -> Result<(Vec<f64>, Vec<f64>), SimulationError> {
    let days = incoming.len();
    let span = (flow_days.ceil() as usize).max(1);

    let mut total_out = vec![0.0; days];
    let mut backlog = vec![0.0; days];
    let mut backlog_sum = 0.0;

    for day in 0..days {
        // Scheduled for today by earlier pulses.
        let prev_due = total_out[day];
        let pulse = incoming[day];
        let mut emitted = 0.0;

        for k in 0..span {
            let idx = day + k;
            if idx >= days {
                break;
            }
            let raw = evaluate_policy(flow_shape, &[k as f64, flow_days], node, Property::FlowShape)?;
            let frac = raw.clamp(0.0, 1.0).min(1.0 - emitted).max(0.0);
            emitted += frac;

            let amount = pulse * frac;
            total_out[idx] += amount;
            if k > 0 {
                backlog_sum += amount;
            }
        }

        backlog_sum = (backlog_sum - prev_due).max(0.0);
        backlog[day] = backlog_sum;
    }

    Ok((total_out, backlog))
}

/// Holds water and releases what the policy asks for, bounded by what is available.
/// Returns `(total_out, stored)`.
pub(crate) fn route_dam(
    incoming: &[f64],
    out_flow: &dyn Callable,
    node: &str,
) -> Result<(Vec<f64>, Vec<f64>), SimulationError> {
    let days = incoming.len();
    let mut total_out = vec![0.0; days];
    let mut storage = vec![0.0; days];
    let mut stored = 0.0;

    for (day, inflow) in incoming.iter().enumerate() {
        let current = stored + inflow;
        let requested = evaluate_policy(out_flow, &[current], node, Property::OutFlow)?;
        let released = requested.min(current).max(0.0);

        total_out[day] = released;
        stored = current - released;
        storage[day] = stored;
    }

    Ok((total_out, storage))
}

/// Divides a node's outflow evenly between its downstream consumers.
pub(crate) fn split(total_out: &[f64], consumers: usize) -> Vec<f64> {
    let branches = consumers.max(1);
    if branches == 1 {
        return total_out.to_vec();
    }
    let share = branches as f64;
    total_out.iter().map(|v| v / share).collect()
}
