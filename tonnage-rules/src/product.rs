use serde::{Deserialize, Serialize};

use crate::normalize::{normalize_code, normalize_text};

/// A product as the rule engine sees it: a unique code and free text.
///
/// Weight factor and category are always derived from these two fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub code: String,
    pub name: String,
}

impl ProductDescriptor {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Normalized view of a product, computed once per classification.
#[derive(Clone, Debug)]
pub(crate) struct NormalizedProduct {
    pub code: String,
    pub name: String,
}

impl NormalizedProduct {
    pub fn from_descriptor(product: &ProductDescriptor) -> Self {
        Self {
            code: normalize_code(&product.code),
            name: normalize_text(&product.name),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.code.is_empty() && self.name.is_empty()
    }
}
