use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SinkError;
use crate::sink::{ResultSink, SinkInput};

/// Writes the result as pretty-printed JSON to a file.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl<R> ResultSink<R> for JsonFileSink
where
    R: Serialize + Send + Sync + 'static,
{
    async fn publish(&self, input: Arc<SinkInput<R>>) -> Result<(), SinkError> {
        let json = serde_json::to_vec_pretty(input.result.as_ref())?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| SinkError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        log::info!(
            "run_id={} wrote {}",
            input.run_id,
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::publish_all;

    #[derive(Serialize)]
    struct Summary {
        precision: f64,
    }

    #[tokio::test]
    async fn writes_json_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("result.json");
        let bad = dir.path().join("missing-dir").join("result.json");

        let sinks: Vec<Box<dyn ResultSink<Summary>>> = vec![
            Box::new(JsonFileSink::new(&good)),
            Box::new(JsonFileSink::new(&bad)),
        ];
        let failures = publish_all(&sinks, SinkInput::new("run-1", Summary { precision: 91.5 })).await;

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&good).unwrap()).unwrap();
        assert_eq!(written["precision"], 91.5);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "JsonFileSink");
    }
}
