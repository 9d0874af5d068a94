use crate::calibration::Contributor;
use crate::selector::Selector;

/// Selects the N products contributing the most mass to a period.
pub struct ContributorSelector {
    pub k: usize,
}

impl Default for ContributorSelector {
    fn default() -> Self {
        Self { k: 5 }
    }
}

impl Selector<Contributor> for ContributorSelector {
    fn score(&self, contributor: &Contributor) -> f64 {
        contributor.mass.abs()
    }

    fn limit(&self) -> Option<usize> {
        Some(self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributor(code: &str, mass: f64) -> Contributor {
        Contributor {
            product_code: code.into(),
            product_name: String::new(),
            rule_id: "r".into(),
            mass,
        }
    }

    #[test]
    fn keeps_largest_contributors_in_order() {
        let selector = ContributorSelector { k: 2 };
        let picked = selector.select(vec![
            contributor("A", 10.0),
            contributor("B", 300.0),
            contributor("C", f64::NAN),
            contributor("D", -50.0),
        ]);
        let codes: Vec<&str> = picked.iter().map(|c| c.product_code.as_str()).collect();
        assert_eq!(codes, vec!["B", "D"]);
    }
}
