//! Drives the three-phase batch-MERGE write protocol against a `GraphStore`
//! and accumulates the run's SLO metrics.

use crate::backend::GraphStore;
use crate::build::BuildOutput;
use crate::model::{DefinedInEdge, FileNode, GraphEdge, GraphNode, RelationshipType};
use identity_contract::EntityType;
use retry::{retry, RetryPolicy};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct GraphWriterConfig {
    pub batch_size: usize,
    pub retry_policy: RetryPolicy,
    /// When set, `write` wipes the store before merging the new graph in,
    /// instead of merging incrementally on top of whatever is already there.
    pub recreate_before_write: bool,
}

impl Default for GraphWriterConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            retry_policy: RetryPolicy::default(),
            recreate_before_write: false,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GraphWriteStats {
    pub nodes_prepared: usize,
    pub nodes_deduped: usize,
    pub nodes_created: usize,
    pub edges_prepared: usize,
    pub edges_deduped: usize,
    pub edges_created: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub retry_attempts: usize,
    pub errors: Vec<String>,
    pub dropped_edges_by_reason: HashMap<String, usize>,
}

impl GraphWriteStats {
    pub fn edge_write_success_rate(&self) -> f64 {
        if self.edges_prepared == 0 {
            return 1.0;
        }
        self.edges_created as f64 / self.edges_prepared as f64
    }
}

pub struct GraphWriter<S: GraphStore> {
    store: S,
    config: GraphWriterConfig,
}

impl<S: GraphStore> GraphWriter<S> {
    pub fn new(store: S, config: GraphWriterConfig) -> Self {
        Self { store, config }
    }

    /// Runs the full write protocol for a built graph, returning the run's
    /// metrics. Never fails the whole run on a single batch error: a failed
    /// batch is counted and skipped so the rest of the write proceeds.
    pub async fn write(&self, built: BuildOutput) -> GraphWriteStats {
        let mut stats = GraphWriteStats {
            nodes_prepared: built.nodes_prepared,
            nodes_deduped: built.nodes_prepared.saturating_sub(built.nodes.len()),
            edges_prepared: built.edges_prepared,
            edges_deduped: built.edges_prepared.saturating_sub(built.edges.len()),
            ..Default::default()
        };
        for (reason, count) in built.drops.as_named() {
            if count > 0 {
                stats.dropped_edges_by_reason.insert(reason.to_string(), count);
            }
        }

        if self.config.recreate_before_write {
            if let Err(e) = self.store.recreate().await {
                warn!(error = %e, "failed to recreate graph store, continuing best-effort");
                stats.errors.push(e.to_string());
            }
        }

        if let Err(e) = self.store.ensure_schema().await {
            warn!(error = %e, "failed to ensure graph schema, continuing best-effort");
            stats.errors.push(e.to_string());
        }

        self.merge_nodes_by_type(&built.nodes, &mut stats).await;
        self.merge_edges_by_type(&built.edges, &mut stats).await;
        self.merge_files_and_defined_in(&built.files, &built.defined_in, &mut stats).await;

        info!(
            nodes_created = stats.nodes_created,
            edges_created = stats.edges_created,
            batches_failed = stats.batches_failed,
            success_rate = stats.edge_write_success_rate(),
            "graph write complete"
        );

        stats
    }

    async fn merge_nodes_by_type(&self, nodes: &[GraphNode], stats: &mut GraphWriteStats) {
        let mut by_type: HashMap<EntityType, Vec<GraphNode>> = HashMap::new();
        for node in nodes {
            by_type.entry(node.entity_type).or_default().push(node.clone());
        }
        for (entity_type, group) in by_type {
            for batch in group.chunks(self.config.batch_size) {
                let batch = batch.to_vec();
                let result = retry(self.config.retry_policy.clone(), || self.store.merge_nodes(entity_type, &batch), |e| e.is_retryable())
                    .await;
                stats.batches_sent += 1;
                match result {
                    Ok(created) => stats.nodes_created += created,
                    Err(e) => {
                        stats.batches_failed += 1;
                        stats.errors.push(e.to_string());
                    }
                }
            }
        }
    }

    async fn merge_edges_by_type(&self, edges: &[GraphEdge], stats: &mut GraphWriteStats) {
        let mut by_type: HashMap<RelationshipType, Vec<GraphEdge>> = HashMap::new();
        for edge in edges {
            by_type.entry(edge.relationship_type).or_default().push(edge.clone());
        }
        for (rel_type, group) in by_type {
            for batch in group.chunks(self.config.batch_size) {
                let batch = batch.to_vec();
                let result = retry(self.config.retry_policy.clone(), || self.store.merge_edges(rel_type, &batch), |e| e.is_retryable()).await;
                stats.batches_sent += 1;
                match result {
                    Ok(created) => stats.edges_created += created,
                    Err(e) => {
                        stats.batches_failed += 1;
                        stats.errors.push(e.to_string());
                    }
                }
            }
        }
    }

    async fn merge_files_and_defined_in(&self, files: &[FileNode], defined_in: &[DefinedInEdge], stats: &mut GraphWriteStats) {
        for batch in files.chunks(self.config.batch_size) {
            let batch = batch.to_vec();
            let result = retry(self.config.retry_policy.clone(), || self.store.merge_files(&batch), |e| e.is_retryable()).await;
            stats.batches_sent += 1;
            if let Err(e) = result {
                stats.batches_failed += 1;
                stats.errors.push(e.to_string());
            }
        }

        for batch in defined_in.chunks(self.config.batch_size) {
            let batch = batch.to_vec();
            let result = retry(self.config.retry_policy.clone(), || self.store.merge_defined_in(&batch), |e| e.is_retryable()).await;
            stats.batches_sent += 1;
            match result {
                Ok(created) => stats.edges_created += created,
                Err(e) => {
                    stats.batches_failed += 1;
                    stats.errors.push(e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::in_memory::InMemoryGraphStore;
    use crate::build::build_graph;
    use scip_reader::{ParseResult, QuadRange, SymbolDef};
    use symbol_mapper::{Disposition, MapperConfig, ScipKind};

    fn def(symbol: &str, file: &str) -> SymbolDef {
        SymbolDef {
            scip_symbol: symbol.to_string(),
            file_path: file.to_string(),
            kind: ScipKind::Class,
            display_name: symbol.to_string(),
            definition_range: Some(QuadRange {
                start_line: 1,
                start_col: 0,
                end_line: 5,
                end_col: 1,
            }),
            relationships: Vec::new(),
            disposition: Disposition::Keep,
        }
    }

    #[tokio::test]
    async fn writes_nodes_and_defined_in_edges() {
        let results = vec![(
            "repo_a".to_string(),
            ParseResult {
                symbols: vec![def("scip-clang . . . app/Widget#", "widget.cpp")],
                ..Default::default()
            },
        )];
        let config = MapperConfig::default();
        let catalog = workspace_catalog::build_workspace_symbol_catalog(&results, None, &config);
        let built = build_graph(&results, &catalog, &config);

        let store = InMemoryGraphStore::new();
        let writer = GraphWriter::new(store, GraphWriterConfig::default());
        let stats = writer.write(built).await;

        assert_eq!(stats.nodes_created, 1);
        assert_eq!(stats.nodes_prepared, 1);
        assert!(stats.batches_failed == 0);
    }
}
