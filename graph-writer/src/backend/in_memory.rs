//! In-memory `GraphStore` fake. Backs the writer's unit tests; never used
//! against a real deployment.

use super::GraphStore;
use crate::errors::GraphWriteError;
use crate::model::{DefinedInEdge, FileNode, GraphEdge, GraphNode, RelationshipType};
use async_trait::async_trait;
use identity_contract::EntityType;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryGraphStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    nodes: HashSet<(String, String)>,
    edges: HashSet<(RelationshipType, (String, String), (String, String))>,
    files: HashSet<FileNode>,
    defined_in: HashSet<(String, String, String, String)>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.inner.lock().unwrap().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.lock().unwrap().edges.len()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn recreate(&self) -> Result<(), GraphWriteError> {
        *self.inner.lock().unwrap() = Inner::default();
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<(), GraphWriteError> {
        Ok(())
    }

    async fn merge_nodes(&self, _entity_type: EntityType, nodes: &[GraphNode]) -> Result<usize, GraphWriteError> {
        let mut inner = self.inner.lock().unwrap();
        let mut created = 0;
        for node in nodes {
            if inner.nodes.insert(node.key()) {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn merge_edges(&self, _relationship_type: RelationshipType, edges: &[GraphEdge]) -> Result<usize, GraphWriteError> {
        let mut inner = self.inner.lock().unwrap();
        let mut created = 0;
        for edge in edges {
            if inner.edges.insert(edge.key()) {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn merge_files(&self, files: &[FileNode]) -> Result<usize, GraphWriteError> {
        let mut inner = self.inner.lock().unwrap();
        let mut created = 0;
        for file in files {
            if inner.files.insert(file.clone()) {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn merge_defined_in(&self, edges: &[DefinedInEdge]) -> Result<usize, GraphWriteError> {
        let mut inner = self.inner.lock().unwrap();
        let mut created = 0;
        for edge in edges {
            let key = (
                edge.owner_repo.clone(),
                edge.scip_symbol.clone(),
                edge.file_repo.clone(),
                edge.file_path.clone(),
            );
            if inner.defined_in.insert(key) {
                created += 1;
            }
        }
        Ok(created)
    }
}
