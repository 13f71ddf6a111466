pub mod in_memory;
pub mod qdrant;

use crate::model::{Distance, Point, Result};
use async_trait::async_trait;

/// Capability interface for the vector store: collection lifecycle plus
/// point upsert.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Ensures a collection exists with the given size/distance. Refuses to
    /// reuse a collection whose vector size differs unless `recreate` is set.
    async fn ensure_collection(&self, size: usize, distance: Distance, recreate: bool) -> Result<()>;
    async fn upsert(&self, points: Vec<Point>) -> Result<usize>;
}
