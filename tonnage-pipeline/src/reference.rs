use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ReferenceError;
use crate::types::Period;

/// Audited expected totals (kilograms) per period.
///
/// Read-only after construction. A period that is absent is simply not
/// scored.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReferenceTargetStore {
    targets: BTreeMap<Period, f64>,
}

impl ReferenceTargetStore {
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ReferenceError>
    where
        I: IntoIterator<Item = (Period, f64)>,
    {
        let mut targets = BTreeMap::new();
        for (period, expected) in pairs {
            if !expected.is_finite() {
                return Err(ReferenceError::NonFinite {
                    period: period.to_string(),
                });
            }
            if expected < 0.0 {
                return Err(ReferenceError::Negative {
                    period: period.to_string(),
                    value: expected,
                });
            }
            if targets.insert(period, expected).is_some() {
                return Err(ReferenceError::DuplicatePeriod(period.to_string()));
            }
        }
        Ok(Self { targets })
    }

    pub fn get(&self, period: &Period) -> Option<f64> {
        self.targets.get(period).copied()
    }

    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.targets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Period, f64)> {
        self.targets.iter().map(|(p, v)| (p, *v))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
