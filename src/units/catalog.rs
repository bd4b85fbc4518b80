use super::UnitError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Length,
    Area,
    Volume,
}

impl Kind {
    pub fn canonical_unit(self) -> Unit {
        match self {
            Kind::Length => Unit::Millimetre,
            Kind::Area => Unit::SquareKilometre,
            Kind::Volume => Unit::Litre,
        }
    }

    /// Display candidates, largest factor first.
    fn display_candidates(self) -> &'static [Unit] {
        match self {
            Kind::Length => &[Unit::Kilometre, Unit::Metre, Unit::Centimetre, Unit::Millimetre],
            Kind::Area => &[Unit::SquareKilometre, Unit::Hectare, Unit::SquareMetre],
            Kind::Volume => &[Unit::Megalitre, Unit::Kilolitre, Unit::Litre, Unit::Millilitre],
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Length => "LENGTH",
            Kind::Area => "AREA",
            Kind::Volume => "VOLUME",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Kilometre,
    Metre,
    Centimetre,
    Millimetre,
    SquareMetre,
    Hectare,
    SquareKilometre,
    Litre,
    Millilitre,
    Kilolitre,
    Megalitre,
}

impl Unit {
    /// Declaration order. Label lookups walk this list, so `mL` is found before `ML`
    /// when matching case-insensitively.
    pub const ALL: [Unit; 11] = [
        Unit::Kilometre,
        Unit::Metre,
        Unit::Centimetre,
        Unit::Millimetre,
        Unit::SquareMetre,
        Unit::Hectare,
        Unit::SquareKilometre,
        Unit::Litre,
        Unit::Millilitre,
        Unit::Kilolitre,
        Unit::Megalitre,
    ];

    pub fn kind(self) -> Kind {
        match self {
            Unit::Kilometre | Unit::Metre | Unit::Centimetre | Unit::Millimetre => Kind::Length,
            Unit::SquareMetre | Unit::Hectare | Unit::SquareKilometre => Kind::Area,
            Unit::Litre | Unit::Millilitre | Unit::Kilolitre | Unit::Megalitre => Kind::Volume,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Unit::Kilometre => "km",
            Unit::Metre => "m",
            Unit::Centimetre => "cm",
            Unit::Millimetre => "mm",
            Unit::SquareMetre => "sqm",
            Unit::Hectare => "ha",
            Unit::SquareKilometre => "sqkm",
            Unit::Litre => "L",
            Unit::Millilitre => "mL",
            Unit::Kilolitre => "kL",
            Unit::Megalitre => "ML",
        }
    }

    /// Multiplier from this unit to the canonical unit of its kind.
    pub fn factor(self) -> f64 {
        match self {
            Unit::Kilometre => 1_000_000.0,
            Unit::Metre => 1_000.0,
            Unit::Centimetre => 10.0,
            Unit::Millimetre => 1.0,
            Unit::SquareMetre => 0.000_001,
            Unit::Hectare => 0.01,
            Unit::SquareKilometre => 1.0,
            Unit::Litre => 1.0,
            Unit::Millilitre => 0.001,
            Unit::Kilolitre => 1_000.0,
            Unit::Megalitre => 1_000_000.0,
        }
    }

    #[inline]
    pub fn to_canonical(self, value: f64) -> f64 {
        value * self.factor()
    }

    #[inline]
    pub fn from_canonical(self, canonical: f64) -> f64 {
        canonical / self.factor()
    }

    /// Exact label match first, then a case-insensitive pass.
    pub fn parse(label: &str) -> Result<Unit, UnitError> {
        let norm = label.trim();
        Self::ALL
            .iter()
            .find(|u| u.label() == norm)
            .or_else(|| Self::ALL.iter().find(|u| u.label().eq_ignore_ascii_case(norm)))
            .copied()
            .ok_or_else(|| UnitError::UnknownUnit(label.to_string()))
    }

    /// Largest display unit whose factor does not exceed the magnitude, so small values
    /// use small units. Falls back to the smallest candidate.
    pub fn best_for(kind: Kind, canonical: f64) -> Unit {
        let candidates = kind.display_candidates();
        let magnitude = canonical.abs();
        candidates
            .iter()
            .find(|u| magnitude >= u.factor())
            .or_else(|| candidates.last())
            .copied()
            .unwrap_or_else(|| kind.canonical_unit())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("km", Unit::Kilometre)]
    #[case(" m ", Unit::Metre)]
    #[case("ML", Unit::Megalitre)]
    #[case("mL", Unit::Millilitre)]
    #[case("ml", Unit::Millilitre)] // case-insensitive pass, first match wins
    #[case("KL", Unit::Kilolitre)]
    #[case("SQKM", Unit::SquareKilometre)]
    #[case("Ha", Unit::Hectare)]
    fn test_parse_labels(#[case] input: &str, #[case] expected: Unit) {
        assert_eq!(Unit::parse(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        for input in ["", "furlong", "m^2"] {
            assert_eq!(
                Unit::parse(input).unwrap_err(),
                UnitError::UnknownUnit(input.to_string()),
                "Should fail: '{}'",
                input
            );
        }
    }

    #[rstest]
    #[case(Kind::Volume, 2.5e7, Unit::Megalitre)]
    #[case(Kind::Volume, 1_000.0, Unit::Kilolitre)]
    #[case(Kind::Volume, 0.5, Unit::Millilitre)]
    #[case(Kind::Volume, 0.0, Unit::Millilitre)]
    #[case(Kind::Length, 1_500.0, Unit::Metre)]
    #[case(Kind::Area, 0.05, Unit::Hectare)]
    #[case(Kind::Area, -3.0, Unit::SquareKilometre)]
    fn test_best_fit_display_unit(#[case] kind: Kind, #[case] canonical: f64, #[case] expected: Unit) {
        assert_eq!(Unit::best_for(kind, canonical), expected);
    }

    #[test]
    fn test_every_unit_has_its_kind_as_display_candidate() {
        for unit in Unit::ALL {
            assert!(unit.kind().display_candidates().contains(&unit), "{}", unit);
        }
    }
}
