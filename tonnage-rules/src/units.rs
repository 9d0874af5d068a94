//! Mass units and the conversion constants into the internal unit (kilograms).
//!
//! Every rule that declares a non-metric amount is converted through the
//! constants here, once, when the rule set is compiled. No rule carries an
//! inlined conversion factor of its own.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kilograms per avoirdupois pound (exact by definition).
pub const KG_PER_POUND: f64 = 0.453_592_37;

/// Kilograms per gram.
pub const KG_PER_GRAM: f64 = 0.001;

/// Kilograms per metric tonne.
pub const KG_PER_TONNE: f64 = 1000.0;

/// The unit a rule's `amount` is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassUnit {
    #[default]
    #[serde(alias = "kg")]
    Kilogram,
    #[serde(alias = "g", alias = "gr")]
    Gram,
    #[serde(alias = "lb", alias = "lbs")]
    Pound,
    #[serde(alias = "t", alias = "ton")]
    Tonne,
}

impl MassUnit {
    /// Kilograms represented by one of this unit.
    pub fn kilograms_per_unit(self) -> f64 {
        match self {
            MassUnit::Kilogram => 1.0,
            MassUnit::Gram => KG_PER_GRAM,
            MassUnit::Pound => KG_PER_POUND,
            MassUnit::Tonne => KG_PER_TONNE,
        }
    }

    /// Convert an amount in this unit to kilograms.
    pub fn to_kilograms(self, amount: f64) -> f64 {
        amount * self.kilograms_per_unit()
    }
}

impl fmt::Display for MassUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassUnit::Kilogram => write!(f, "kg"),
            MassUnit::Gram => write!(f, "g"),
            MassUnit::Pound => write!(f, "lb"),
            MassUnit::Tonne => write!(f, "t"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifty_pounds_in_kilograms() {
        let kg = MassUnit::Pound.to_kilograms(50.0);
        assert!((kg - 22.679_618_5).abs() < 1e-9);
    }

    #[test]
    fn grams_and_tonnes_scale_linearly() {
        assert!((MassUnit::Gram.to_kilograms(500.0) - 0.5).abs() < 1e-12);
        assert!((MassUnit::Tonne.to_kilograms(0.9) - 900.0).abs() < 1e-9);
        assert_eq!(MassUnit::Kilogram.to_kilograms(25.0), 25.0);
    }
}
