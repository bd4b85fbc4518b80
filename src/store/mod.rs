//! The network's node arena and adjacency.
mod error;
mod registry;
mod types;

pub use error::ConfigError;
pub use registry::Registry;
pub use types::{AreaSource, DamParams, NodeId, NodeKind, NodeMetadata, RiverParams};
