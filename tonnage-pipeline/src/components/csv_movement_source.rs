use std::path::PathBuf;

use async_trait::async_trait;
use log::info;

use crate::error::{LoadError, LoadResult};
use crate::loader::{load_movements, MovementBatch};
use crate::source::MovementSource;

/// Reads movements from a CSV file.
pub struct CsvMovementSource {
    path: PathBuf,
}

impl CsvMovementSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MovementSource for CsvMovementSource {
    async fn fetch(&self) -> LoadResult<MovementBatch> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        let batch = load_movements(bytes.as_slice())?;
        info!(
            "source={} path={} movements={} products={}",
            self.name(),
            self.path.display(),
            batch.movements.len(),
            batch.products.len()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_movements_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "product_code,product_name,quantity,document_type,date,agent").unwrap();
        writeln!(file, "P1,AZUCAR 25 KG,3,sale,2024-04-01,").unwrap();

        let source = CsvMovementSource::new(file.path());
        let batch = source.fetch().await.unwrap();
        assert_eq!(batch.movements.len(), 1);
        assert_eq!(source.name(), "CsvMovementSource");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = CsvMovementSource::new("/no/such/movements.csv");
        assert!(matches!(source.fetch().await, Err(LoadError::Io { .. })));
    }
}
