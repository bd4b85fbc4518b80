//! Errors raised while declaring nodes and wiring edges.
use super::NodeId;
use crate::policy::Property;
use crate::units::UnitError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Node {0:?} is not part of this network")]
    MissingNode(NodeId),
    #[error("Network already holds {0} nodes, no handle is left for another")]
    Full(usize),
    #[error("Unknown node '{0}'")]
    UnknownNode(String),
    #[error("A node named '{0}' already exists")]
    DuplicateName(String),
    #[error("Property '{property}' of '{node}' must be a {expected} argument function (got {found})")]
    WrongArity { node: String, property: Property, expected: usize, found: usize },
    #[error("Property '{property}' of '{node}' is invalid: {reason}")]
    InvalidParameter { node: String, property: &'static str, reason: String },
    #[error("Property '{property}' of '{node}': {source}")]
    Unit { node: String, property: &'static str, #[source] source: UnitError },
}
