pub mod http;
pub mod mock;

use crate::model::Result;
use async_trait::async_trait;

/// Batch embedding capability: given texts, return one vector per text, each
/// of length `dimension`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String], dimension: usize) -> Result<Vec<Vec<f32>>>;
}
