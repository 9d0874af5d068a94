use std::collections::HashMap;

use tonnage_rules::ProductDescriptor;

/// Product descriptors keyed by code.
///
/// Movements only carry a product code; the name used for classification
/// is looked up here. A code missing from the catalog is classified on its
/// code alone.
#[derive(Clone, Debug, Default)]
pub struct ProductCatalog {
    products: HashMap<String, ProductDescriptor>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product. Returns the previous descriptor, if any.
    pub fn insert(&mut self, product: ProductDescriptor) -> Option<ProductDescriptor> {
        self.products.insert(product.code.clone(), product)
    }

    pub fn get(&self, code: &str) -> Option<&ProductDescriptor> {
        self.products.get(code)
    }

    /// Name for a code, or an empty string when unknown.
    pub fn name_of(&self, code: &str) -> &str {
        self.products.get(code).map_or("", |p| p.name.as_str())
    }

    /// Descriptor for a code, falling back to a nameless one.
    pub fn descriptor(&self, code: &str) -> ProductDescriptor {
        self.products
            .get(code)
            .cloned()
            .unwrap_or_else(|| ProductDescriptor::new(code, ""))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductDescriptor> {
        self.products.values()
    }
}

impl FromIterator<ProductDescriptor> for ProductCatalog {
    fn from_iter<I: IntoIterator<Item = ProductDescriptor>>(iter: I) -> Self {
        let mut catalog = ProductCatalog::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}
