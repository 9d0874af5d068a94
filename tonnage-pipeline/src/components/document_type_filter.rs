use std::collections::BTreeSet;

use tonnage_rules::normalize::{contains_token, normalize_text};

use crate::filter::Filter;
use crate::policy::ConditionalInclusion;
use crate::products::ProductCatalog;
use crate::types::{DocumentType, Movement};

/// Keeps movements whose document type is included outright, or included
/// conditionally for products whose name contains a token.
pub struct DocumentTypeFilter {
    included: BTreeSet<DocumentType>,
    conditional: Vec<(DocumentType, Vec<String>)>,
}

impl DocumentTypeFilter {
    pub fn new(included: BTreeSet<DocumentType>, conditional: &[ConditionalInclusion]) -> Self {
        let conditional = conditional
            .iter()
            .map(|c| {
                let tokens = c
                    .name_contains
                    .iter()
                    .map(|t| normalize_text(t))
                    .filter(|t| !t.is_empty())
                    .collect();
                (c.document_type, tokens)
            })
            .collect();
        Self {
            included,
            conditional,
        }
    }
}

impl Filter<ProductCatalog, Movement> for DocumentTypeFilter {
    fn keep(&self, products: &ProductCatalog, movement: &Movement) -> bool {
        if self.included.contains(&movement.document_type) {
            return true;
        }
        let mut applicable = self
            .conditional
            .iter()
            .filter(|(document_type, _)| *document_type == movement.document_type)
            .peekable();
        if applicable.peek().is_none() {
            return false;
        }
        let name = normalize_text(products.name_of(&movement.product_code));
        applicable.any(|(_, tokens)| tokens.iter().any(|t| contains_token(&name, t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tonnage_rules::ProductDescriptor;

    fn movement(code: &str, document_type: DocumentType) -> Movement {
        Movement::new(code, 1.0, document_type, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
    }

    #[test]
    fn delivery_notes_only_for_matching_names() {
        let products: ProductCatalog = [
            ProductDescriptor::new("STD", "Azúcar Estándar Granulada 50 KG"),
            ProductDescriptor::new("REF", "Azucar Refinada 50 KG"),
        ]
        .into_iter()
        .collect();
        let filter = DocumentTypeFilter::new(
            BTreeSet::from([DocumentType::Sale]),
            &[ConditionalInclusion {
                document_type: DocumentType::DeliveryNote,
                name_contains: vec!["AZUCAR ESTANDAR GRANULADA".into()],
            }],
        );

        let std_note = movement("STD", DocumentType::DeliveryNote);
        let ref_note = movement("REF", DocumentType::DeliveryNote);
        let ref_sale = movement("REF", DocumentType::Sale);
        let ref_return = movement("REF", DocumentType::Return);

        assert!(filter.keep(&products, &std_note));
        assert!(!filter.keep(&products, &ref_note));
        assert!(filter.keep(&products, &ref_sale));
        assert!(!filter.keep(&products, &ref_return));
    }

    #[test]
    fn filter_partitions_in_order() {
        let filter = DocumentTypeFilter::new(BTreeSet::from([DocumentType::Sale]), &[]);
        let movements = [
            movement("A", DocumentType::Sale),
            movement("B", DocumentType::Return),
            movement("C", DocumentType::Sale),
        ];
        let result = filter.filter(&ProductCatalog::new(), movements.iter().collect());
        let kept: Vec<&str> = result.kept.iter().map(|m| m.product_code.as_str()).collect();
        assert_eq!(kept, vec!["A", "C"]);
        assert_eq!(result.removed.len(), 1);
        assert_eq!(filter.name(), "DocumentTypeFilter");
    }
}
