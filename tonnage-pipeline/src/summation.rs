//! Compensated (Neumaier) summation.
//!
//! Aggregation adds millions of products `quantity * factor` of very
//! different magnitudes. A plain `f64` accumulator loses the low bits of
//! small terms once the total grows; the compensation term keeps them.

use std::iter::FromIterator;
use std::ops::AddAssign;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
}

impl NeumaierSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    /// Fold another partial sum in.
    pub fn merge(&mut self, other: &NeumaierSum) {
        self.add(other.sum);
        self.add(other.compensation);
    }

    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl AddAssign<f64> for NeumaierSum {
    fn add_assign(&mut self, value: f64) {
        self.add(value);
    }
}

impl Extend<f64> for NeumaierSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<f64> for NeumaierSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sum = NeumaierSum::new();
        sum.extend(iter);
        sum
    }
}
