//! CSV loaders for movements and reference targets.
//!
//! Movement columns:
//!   product_code, product_name, quantity, document_type, date, agent
//!
//! `document_type` accepts names (`sale`, `invoice`, `return`, ...) or the
//! ERP's numeric document ids. `date` is `YYYY-MM-DD`, optionally followed
//! by a time. `agent` may be empty.
//!
//! Reference columns:
//!   period, expected_total_mass

use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tonnage_rules::ProductDescriptor;

use crate::error::{LoadError, LoadResult};
use crate::products::ProductCatalog;
use crate::reference::ReferenceTargetStore;
use crate::types::{DocumentType, Movement, Period};

/// Movements together with the product names seen alongside them.
#[derive(Clone, Debug, Default)]
pub struct MovementBatch {
    pub movements: Vec<Movement>,
    pub products: ProductCatalog,
}

#[derive(Debug, Deserialize)]
struct MovementRecord {
    product_code: String,
    #[serde(default)]
    product_name: String,
    quantity: f64,
    document_type: String,
    date: String,
    #[serde(default)]
    agent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceRecord {
    period: String,
    expected_total_mass: f64,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(text, "%d/%m/%Y").ok())
}

/// Load movements from a CSV reader.
pub fn load_movements<R: Read>(reader: R) -> LoadResult<MovementBatch> {
    let mut csv_reader = csv_reader(reader);
    let mut batch = MovementBatch::default();

    for (row, result) in csv_reader.deserialize().enumerate() {
        let line = row + 2;
        let record: MovementRecord = result.map_err(|e| LoadError::Csv {
            line,
            message: e.to_string(),
        })?;

        if record.product_code.is_empty() {
            return Err(LoadError::InvalidRecord {
                line,
                message: "product_code is empty".to_string(),
            });
        }
        if !record.quantity.is_finite() {
            return Err(LoadError::InvalidRecord {
                line,
                message: format!("quantity {} is not finite", record.quantity),
            });
        }
        let document_type: DocumentType = record
            .document_type
            .parse()
            .map_err(|message| LoadError::InvalidRecord { line, message })?;
        let date = parse_date(&record.date).ok_or_else(|| LoadError::InvalidRecord {
            line,
            message: format!("invalid date '{}'", record.date),
        })?;

        let known_name = batch
            .products
            .get(&record.product_code)
            .is_some_and(|p| !p.name.is_empty());
        if !known_name {
            batch.products.insert(ProductDescriptor::new(
                record.product_code.clone(),
                record.product_name,
            ));
        }

        batch.movements.push(Movement {
            product_code: record.product_code,
            quantity: record.quantity,
            document_type,
            date,
            agent: record.agent.filter(|a| !a.is_empty()),
        });
    }

    Ok(batch)
}

/// Load movements from a CSV file path.
pub fn load_movements_file(path: impl AsRef<Path>) -> LoadResult<MovementBatch> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_movements(file)
}

/// Load reference targets from a CSV reader.
pub fn load_reference<R: Read>(reader: R) -> LoadResult<ReferenceTargetStore> {
    let mut csv_reader = csv_reader(reader);
    let mut pairs = Vec::new();

    for (row, result) in csv_reader.deserialize().enumerate() {
        let line = row + 2;
        let record: ReferenceRecord = result.map_err(|e| LoadError::Csv {
            line,
            message: e.to_string(),
        })?;
        let period: Period = record
            .period
            .parse()
            .map_err(|message| LoadError::InvalidRecord { line, message })?;
        pairs.push((period, record.expected_total_mass));
    }

    Ok(ReferenceTargetStore::from_pairs(pairs)?)
}

pub fn load_reference_file(path: impl AsRef<Path>) -> LoadResult<ReferenceTargetStore> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_reference(file)
}

/// Read a whole text file, mapping the error into `LoadError`.
pub fn read_to_string(path: impl AsRef<Path>) -> LoadResult<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MOVEMENTS: &str = "\
product_code,product_name,quantity,document_type,date,agent
PESGR25,AZUCAR ESTANDAR 25 KG,40,sale,2024-01-05,MOLIENDAS
PESGR25,,5,7,2024-01-09 10:30:00,
PREP1,AZUCAR REFINADA 1 KG,12.5,35,05/02/2024,SWITEN
";

    #[test]
    fn loads_movements_and_products() {
        let batch = load_movements(MOVEMENTS.as_bytes()).unwrap();
        assert_eq!(batch.movements.len(), 3);
        assert_eq!(batch.products.len(), 2);
        assert_eq!(batch.products.name_of("PESGR25"), "AZUCAR ESTANDAR 25 KG");

        let ret = &batch.movements[1];
        assert_eq!(ret.document_type, DocumentType::Return);
        assert_eq!(ret.date, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(ret.agent, None);

        let third = &batch.movements[2];
        assert_eq!(third.document_type, DocumentType::Sale);
        assert_eq!(third.date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
        assert_eq!(third.agent.as_deref(), Some("SWITEN"));
    }

    #[test]
    fn bad_rows_report_their_line() {
        let text = "product_code,product_name,quantity,document_type,date,agent\n\
                    A,X,1,sale,2024-01-01,\n\
                    A,X,1,sale,not-a-date,\n";
        match load_movements(text.as_bytes()) {
            Err(LoadError::InvalidRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected invalid record, got {other:?}"),
        }

        let text = "product_code,product_name,quantity,document_type,date,agent\n\
                    A,X,lots,sale,2024-01-01,\n";
        assert!(matches!(
            load_movements(text.as_bytes()),
            Err(LoadError::Csv { line: 2, .. })
        ));
    }

    #[test]
    fn loads_reference_targets_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "period,expected_total_mass").unwrap();
        writeln!(file, "2024-01,30171996").unwrap();
        writeln!(file, "2024-02,33361032").unwrap();

        let store = load_reference_file(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get(&Period::Month { year: 2024, month: 2 }),
            Some(33_361_032.0)
        );
    }

    #[test]
    fn duplicate_reference_period_is_rejected() {
        let text = "period,expected_total_mass\n--01,1\n--01,2\n";
        assert!(matches!(
            load_reference(text.as_bytes()),
            Err(LoadError::Reference(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_movements_file("/definitely/not/here.csv"),
            Err(LoadError::Io { .. })
        ));
    }
}
