use super::{format_number, Kind, Unit, UnitError};
use std::fmt;

/// A physical value in the canonical unit of its kind, optionally remembering the unit
/// it should be displayed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    kind: Kind,
    canonical: f64,
    preferred: Option<Unit>,
}

impl Quantity {
    /// Parses `label` and converts `value` into canonical form. The parsed unit becomes
    /// the preferred display unit.
    pub fn of(value: f64, label: &str) -> Result<Self, UnitError> {
        Ok(Self::from_unit(value, Unit::parse(label)?))
    }

    pub fn from_unit(value: f64, unit: Unit) -> Self {
        Self {
            kind: unit.kind(),
            canonical: unit.to_canonical(value),
            preferred: Some(unit),
        }
    }

    pub fn canonical(value: f64, kind: Kind) -> Self {
        Self { kind, canonical: value, preferred: None }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn canonical_value(&self) -> f64 {
        self.canonical
    }

    pub fn preferred(&self) -> Option<Unit> {
        self.preferred
    }

    pub fn with_preferred(self, unit: Unit) -> Result<Self, UnitError> {
        self.expect_kind(unit.kind())?;
        Ok(Self { preferred: Some(unit), ..self })
    }

    pub fn as_unit(&self, unit: Unit) -> Result<f64, UnitError> {
        self.expect_kind(unit.kind())?;
        Ok(unit.from_canonical(self.canonical))
    }

    pub fn as_label(&self, label: &str) -> Result<f64, UnitError> {
        self.as_unit(Unit::parse(label)?)
    }

    pub fn add(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        other.expect_kind(self.kind)?;
        Ok(Self { canonical: self.canonical + other.canonical, ..*self })
    }

    pub fn sub(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        other.expect_kind(self.kind)?;
        Ok(Self { canonical: self.canonical - other.canonical, ..*self })
    }

    pub fn neg(&self) -> Quantity {
        Self { canonical: -self.canonical, ..*self }
    }

    pub fn scale(&self, factor: f64) -> Quantity {
        Self { canonical: self.canonical * factor, ..*self }
    }

    pub(crate) fn expect_kind(&self, expected: Kind) -> Result<(), UnitError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(UnitError::KindMismatch { expected, found: self.kind })
        }
    }

    fn display_unit(&self) -> Unit {
        self.preferred
            .unwrap_or_else(|| Unit::best_for(self.kind, self.canonical))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.display_unit();
        write!(f, "{}{}", format_number(unit.from_canonical(self.canonical)), unit.label())
    }
}

/// Rain depth over a catchment as a volume: 1 mm over 1 km² is exactly 1 ML.
pub fn rainfall_volume(rainfall_mm: f64, area: &Quantity) -> Result<Quantity, UnitError> {
    area.expect_kind(Kind::Area)?;
    Ok(Quantity::from_unit(rainfall_mm * area.canonical, Unit::Megalitre))
}
