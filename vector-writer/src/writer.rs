//! Drives the embed-then-upsert pipeline described in the Vector Writer
//! contract: dual-budget batching, one embed call per batch, bounded retry,
//! idempotent UUIDv5 upsert.

use crate::batch::batch_entities;
use crate::config::VectorWriterConfig;
use crate::embedding::EmbeddingProvider;
use crate::model::{build_point, embedding_text, truncate, Point, VectorWriteError, VectorWriteStats};
use crate::store::VectorStore;
use entity_extractor::EntityRecord;
use retry::retry;
use std::path::Path;
use tracing::{info, warn};

pub struct VectorWriter<S: VectorStore, E: EmbeddingProvider> {
    store: S,
    embedder: E,
    config: VectorWriterConfig,
}

impl<S: VectorStore, E: EmbeddingProvider> VectorWriter<S, E> {
    pub fn new(store: S, embedder: E, config: VectorWriterConfig) -> Self {
        Self { store, embedder, config }
    }

    /// Runs the full pipeline over an in-memory entity list. Never aborts
    /// the whole run on a single batch's failure: the batch is counted and
    /// skipped.
    pub async fn write(&self, entities: Vec<EntityRecord>) -> VectorWriteStats {
        let mut stats = VectorWriteStats::default();
        if entities.is_empty() {
            return stats;
        }

        if let Err(e) = self
            .store
            .ensure_collection(self.config.dimension, self.config.distance, self.config.recreate_on_mismatch)
            .await
        {
            warn!(error = %e, "failed to ensure vector collection");
            stats.errors.push(e.to_string());
            return stats;
        }

        let batches = batch_entities(&entities, self.config.max_batch_entities, self.config.max_batch_chars);
        for batch in batches {
            self.write_batch(batch, &mut stats).await;
        }

        info!(
            points_prepared = stats.points_prepared,
            points_upserted = stats.points_upserted,
            batches_failed = stats.batches_failed,
            "vector write complete"
        );
        stats
    }

    async fn write_batch(&self, batch: Vec<EntityRecord>, stats: &mut VectorWriteStats) {
        stats.points_prepared += batch.len();

        let texts: Vec<String> = batch
            .iter()
            .map(|e| truncate(&embedding_text(e), self.config.max_batch_chars))
            .collect();

        let dimension = self.config.dimension;
        let embed_result = retry(
            self.config.retry_policy,
            || self.embedder.embed(&texts, dimension),
            VectorWriteError::is_retryable,
        )
        .await;

        let vectors = match embed_result {
            Ok(v) => v,
            Err(e) => {
                stats.batches_failed += 1;
                match e {
                    VectorWriteError::EmbeddingCountMismatch { .. } => stats.embedding_count_mismatch += 1,
                    VectorWriteError::VectorDimensionMismatch { .. } => stats.vector_dimension_mismatch += 1,
                    _ => stats.embedding_failures += 1,
                }
                stats.errors.push(e.to_string());
                return;
            }
        };

        if vectors.len() != batch.len() {
            stats.batches_failed += 1;
            stats.embedding_count_mismatch += 1;
            return;
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            stats.batches_failed += 1;
            stats.vector_dimension_mismatch += 1;
            stats.errors.push(format!("vector dimension mismatch: got {} want {}", bad.len(), dimension));
            return;
        }

        let points: Vec<Point> = batch.iter().zip(vectors).map(|(e, v)| build_point(e, v)).collect();

        let upsert_result = retry(
            self.config.retry_policy,
            || self.store.upsert(points.clone()),
            VectorWriteError::is_retryable,
        )
        .await;

        match upsert_result {
            Ok(n) => stats.points_upserted += n,
            Err(e) => {
                stats.batches_failed += 1;
                stats.upsert_failed += 1;
                stats.errors.push(e.to_string());
            }
        }
    }

    /// Streams entities from a newline-delimited JSON file, chunking into
    /// bounded sub-batches and delegating to the in-memory variant.
    pub async fn write_jsonl(&self, path: &Path, chunk_size: usize) -> Result<VectorWriteStats, VectorWriteError> {
        let entities =
            entity_extractor::read_entities_jsonl(path).map_err(|e| VectorWriteError::Config(e.to_string()))?;

        let mut total = VectorWriteStats::default();
        for chunk in entities.chunks(chunk_size.max(1)) {
            let partial = self.write(chunk.to_vec()).await;
            merge_stats(&mut total, partial);
        }
        Ok(total)
    }
}

fn merge_stats(total: &mut VectorWriteStats, partial: VectorWriteStats) {
    total.points_prepared += partial.points_prepared;
    total.points_upserted += partial.points_upserted;
    total.batches_sent += partial.batches_sent;
    total.batches_failed += partial.batches_failed;
    total.embedding_failures += partial.embedding_failures;
    total.embedding_count_mismatch += partial.embedding_count_mismatch;
    total.vector_dimension_mismatch += partial.vector_dimension_mismatch;
    total.upsert_failed += partial.upsert_failed;
    total.retry_attempts += partial.retry_attempts;
    total.errors.extend(partial.errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::mock::MockEmbeddingProvider;
    use crate::model::Distance;
    use crate::store::in_memory::InMemoryVectorStore;
    use identity_contract::EntityType;

    fn entity(name: &str) -> EntityRecord {
        EntityRecord {
            global_uri: format!("repo_a::math.cpp::Function::{name}"),
            repo_name: "repo_a".to_string(),
            file_path: "math.cpp".to_string(),
            entity_type: EntityType::Function,
            entity_name: name.to_string(),
            docstring: Some("adds two numbers".to_string()),
            code_text: format!("int {name}(int a, int b) {{ return a + b; }}"),
            start_line: 1,
            end_line: 1,
            is_templated: false,
            function_sig_hash: Some("sig_aaaa1111".to_string()),
        }
    }

    #[tokio::test]
    async fn writes_points_for_every_entity() {
        let config = VectorWriterConfig::new(8, Distance::Cosine);
        let writer = VectorWriter::new(InMemoryVectorStore::new(), MockEmbeddingProvider, config);
        let stats = writer.write(vec![entity("add"), entity("sub")]).await;

        assert_eq!(stats.points_prepared, 2);
        assert_eq!(stats.points_upserted, 2);
        assert_eq!(stats.batches_failed, 0);
    }

    #[tokio::test]
    async fn overloads_get_distinct_points() {
        let config = VectorWriterConfig::new(8, Distance::Cosine);
        let writer = VectorWriter::new(InMemoryVectorStore::new(), MockEmbeddingProvider, config);

        let mut a = entity("add");
        a.function_sig_hash = Some("sig_aaaa1111".to_string());
        let mut b = entity("add");
        b.function_sig_hash = Some("sig_bbbb2222".to_string());

        let stats = writer.write(vec![a, b]).await;
        assert_eq!(stats.points_upserted, 2);
    }
}
