//! Network evaluation: per-node kernels, the recursive driver, and run results.
pub mod engine;
pub mod kernel;
pub mod ledger;

pub use engine::{Engine, RunOptions};
pub use ledger::{DetailedResult, NamedSeries, NodeOutputs, SimulationError};
