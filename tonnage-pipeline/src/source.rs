use async_trait::async_trait;

use crate::error::LoadResult;
use crate::loader::MovementBatch;
use crate::util;

/// Supplies a finite, already-materialized batch of movements.
///
/// This is the only place the pipeline waits on I/O; everything after
/// `fetch` runs on in-memory data.
#[async_trait]
pub trait MovementSource: Send + Sync {
    /// Fetch the movements and the product names that go with them.
    async fn fetch(&self) -> LoadResult<MovementBatch>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// An in-memory batch is its own source.
#[async_trait]
impl MovementSource for MovementBatch {
    async fn fetch(&self) -> LoadResult<MovementBatch> {
        Ok(self.clone())
    }
}
