//! Declarative policies usable without a scripting host (scenario files, CLI).

use super::{Callable, HostError, HostValue};
use crate::units::format_number;
use serde::{Deserialize, Serialize};

/// Fraction of a pulse leaving a river `offset` days after it arrived.
/// Invoked as `(offset, flow_days)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowShape {
    /// Everything leaves on the day it arrives.
    Immediate,
    /// Equal share per whole day of the flow duration; a trailing partial day gets the
    /// remainder so the shares sum to one.
    Uniform,
    Constant { value: f64 },
    /// Fraction by offset, zero past the end of the table.
    Table { fractions: Vec<f64> },
}

impl FlowShape {
    fn fraction(&self, offset: f64, flow_days: f64) -> f64 {
        match self {
            FlowShape::Immediate => {
                if offset == 0.0 { 1.0 } else { 0.0 }
            }
            FlowShape::Uniform => {
                if flow_days <= 0.0 {
                    return if offset == 0.0 { 1.0 } else { 0.0 };
                }
                let whole = flow_days.floor();
                if offset + 1.0 <= flow_days {
                    1.0 / flow_days
                } else if offset == whole {
                    (flow_days - whole) / flow_days
                } else {
                    0.0
                }
            }
            FlowShape::Constant { value } => *value,
            FlowShape::Table { fractions } => {
                if offset < 0.0 {
                    return 0.0;
                }
                fractions.get(offset as usize).copied().unwrap_or(0.0)
            }
        }
    }
}

impl Callable for FlowShape {
    fn arity(&self) -> usize {
        2
    }

    fn call(&self, args: &[f64]) -> Result<HostValue, HostError> {
        let offset = args.first().copied().unwrap_or(0.0);
        let flow_days = args.get(1).copied().unwrap_or(0.0);
        Ok(HostValue::Number(self.fraction(offset, flow_days)))
    }

    fn describe(&self) -> String {
        match self {
            FlowShape::Immediate => "immediate".to_string(),
            FlowShape::Uniform => "uniform".to_string(),
            FlowShape::Constant { value } => format_number(*value),
            FlowShape::Table { fractions } => {
                let cells: Vec<String> = fractions.iter().map(|f| format_number(*f)).collect();
                format!("table[{}]", cells.join(", "))
            }
        }
    }
}

/// Volume a dam releases given what it currently holds (storage plus today's inflow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReleaseRule {
    /// Pass everything through.
    All,
    /// Release up to `max` per day.
    Cap { max: f64 },
    /// Release a fixed share of the current volume.
    Fraction { ratio: f64 },
    /// Hold up to `capacity`, release the excess.
    Spill { capacity: f64 },
    Constant { value: f64 },
}

impl ReleaseRule {
    fn release(&self, current: f64) -> f64 {
        match self {
            ReleaseRule::All => current,
            ReleaseRule::Cap { max } => current.min(*max),
            ReleaseRule::Fraction { ratio } => current * ratio,
            ReleaseRule::Spill { capacity } => (current - capacity).max(0.0),
            ReleaseRule::Constant { value } => *value,
        }
    }
}

impl Callable for ReleaseRule {
    fn arity(&self) -> usize {
        1
    }

    fn call(&self, args: &[f64]) -> Result<HostValue, HostError> {
        let current = args.first().copied().unwrap_or(0.0);
        Ok(HostValue::Number(self.release(current)))
    }

    fn describe(&self) -> String {
        match self {
            ReleaseRule::All => "all".to_string(),
            ReleaseRule::Cap { max } => format!("cap({})", format_number(*max)),
            ReleaseRule::Fraction { ratio } => format!("fraction({})", format_number(*ratio)),
            ReleaseRule::Spill { capacity } => format!("spill({})", format_number(*capacity)),
            ReleaseRule::Constant { value } => format_number(*value),
        }
    }
}
