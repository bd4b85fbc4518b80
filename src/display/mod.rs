//! Text renderings of a network and of run results.
pub mod report;
pub mod table;
pub mod tree;

pub use report::{outflow_table, render_report, volume_table};
pub use tree::render_tree;
