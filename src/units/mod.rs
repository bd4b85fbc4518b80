//! Canonical physical quantities for the network model.
//!
//! Every value carries one of three kinds and is stored in that kind's canonical unit
//! (millimetres, square kilometres, litres). Conversions always pass through the
//! canonical magnitude, so arithmetic never has to know about display units.

mod catalog;
mod format;
mod quantity;

pub use catalog::{Kind, Unit};
pub use format::format_number;
pub use quantity::{rainfall_volume, Quantity};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Unknown unit: '{0}'")]
    UnknownUnit(String),
    #[error("Unit kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: Kind, found: Kind },
}
