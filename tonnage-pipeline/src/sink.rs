use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::error::SinkError;
use crate::util;

/// What a sink receives: a run label and the finished result.
#[derive(Clone, Debug)]
pub struct SinkInput<R> {
    pub run_id: String,
    pub result: Arc<R>,
}

impl<R> SinkInput<R> {
    pub fn new(run_id: impl Into<String>, result: R) -> Self {
        Self {
            run_id: run_id.into(),
            result: Arc::new(result),
        }
    }
}

/// Receives fully computed results. A sink never changes the result, and a
/// failing sink does not fail the run.
#[async_trait]
pub trait ResultSink<R>: Send + Sync
where
    R: Send + Sync + 'static,
{
    /// Decide if this sink should run.
    fn enable(&self, _input: &SinkInput<R>) -> bool {
        true
    }

    async fn publish(&self, input: Arc<SinkInput<R>>) -> Result<(), SinkError>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// Publish to every enabled sink, in order. Returns the sinks that failed.
pub async fn publish_all<R>(
    sinks: &[Box<dyn ResultSink<R>>],
    input: SinkInput<R>,
) -> Vec<(String, SinkError)>
where
    R: Send + Sync + 'static,
{
    let input = Arc::new(input);
    let mut failures = Vec::new();
    for sink in sinks {
        if !sink.enable(&input) {
            continue;
        }
        match sink.publish(Arc::clone(&input)).await {
            Ok(()) => debug!("run_id={} sink={} published", input.run_id, sink.name()),
            Err(e) => {
                warn!("run_id={} sink={} failed: {}", input.run_id, sink.name(), e);
                failures.push((sink.name().to_string(), e));
            }
        }
    }
    failures
}
