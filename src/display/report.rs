//! Run results as printable tables. Series values are megalitres; every cell is shown
//! as a volume in whichever unit reads best.

use super::table::{BarStyle, Table};
use crate::compute::DetailedResult;
use crate::store::{NodeId, Registry};
use crate::units::{Kind, Quantity, Unit};

fn volume_cell(megalitres: f64) -> String {
    Quantity::canonical(Unit::Megalitre.to_canonical(megalitres), Kind::Volume).to_string()
}

fn value_at(series: Option<&[f64]>, day: usize) -> f64 {
    series.and_then(|s| s.get(day)).copied().unwrap_or(0.0)
}

/// End-of-day volume held in each river touched by the run, one column per river
/// sorted by name.
pub fn volume_table(result: &DetailedResult, registry: &Registry, days: usize) -> String {
    let mut rivers: Vec<NodeId> = result
        .touched()
        .filter(|&id| registry.kind(id).is_river())
        .collect();
    rivers.sort_by(|a, b| registry.name(*a).cmp(registry.name(*b)));

    let header = std::iter::once(String::new()).chain(rivers.iter().map(|&id| registry.name(id).to_string()));
    let mut table = Table::new(false, BarStyle::Double)
        .title(" Volume (After Outflow) ")
        .row(header)
        .header_divider();

    for day in 0..days {
        let cells = rivers.iter().map(|&id| volume_cell(value_at(result.volume(id), day)));
        table = table.row(std::iter::once(format!("Day {}", day + 1)).chain(cells));
    }
    table.end_cap().render()
}

/// Daily outflow, storage and running total of outflow at `root`.
pub fn outflow_table(result: &DetailedResult, registry: &Registry, root: NodeId, days: usize) -> String {
    let mut outflow = Vec::with_capacity(days);
    let mut storage = Vec::with_capacity(days);
    let mut accumulated = Vec::with_capacity(days);
    let mut running = 0.0;

    for day in 0..days {
        let out = value_at(result.total_out(root), day);
        running += out;
        outflow.push(volume_cell(out));
        storage.push(volume_cell(value_at(result.volume(root), day)));
        accumulated.push(volume_cell(running));
    }

    let labelled = |label: &str, cells: Vec<String>| std::iter::once(label.to_string()).chain(cells);
    let header = std::iter::once(String::new()).chain((1..=days).map(|d| format!("Day {}", d)));

    Table::new(true, BarStyle::Double)
        .title(format!(" {} Outflow ", registry.name(root)))
        .row(header)
        .header_divider()
        .row(labelled("Outflow", outflow))
        .row(labelled("Storage", storage))
        .divider()
        .row(labelled("Accumulated", accumulated))
        .end_cap()
        .render()
}

/// Both tables, volume first.
pub fn render_report(result: &DetailedResult, registry: &Registry, root: NodeId, days: usize) -> String {
    let mut out = volume_table(result, registry, days);
    out.push_str(&outflow_table(result, registry, root, days));
    out
}
