pub mod in_memory;
pub mod neo4j;

use crate::errors::GraphWriteError;
use crate::model::{DefinedInEdge, FileNode, GraphEdge, GraphNode, RelationshipType};
use async_trait::async_trait;
use identity_contract::EntityType;

/// Capability interface for the graph store. A concrete implementation is
/// backed by Neo4j (`neo4j::Neo4jGraphStore`); an in-memory fake backs unit
/// tests without a running database.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Detaches and deletes every node and edge this store holds. Used when
    /// a workspace manifest asks for a full rebuild instead of an
    /// incremental merge.
    async fn recreate(&self) -> Result<(), GraphWriteError>;
    async fn ensure_schema(&self) -> Result<(), GraphWriteError>;
    async fn merge_nodes(&self, entity_type: EntityType, nodes: &[GraphNode]) -> Result<usize, GraphWriteError>;
    async fn merge_edges(&self, relationship_type: RelationshipType, edges: &[GraphEdge]) -> Result<usize, GraphWriteError>;
    async fn merge_files(&self, files: &[FileNode]) -> Result<usize, GraphWriteError>;
    async fn merge_defined_in(&self, edges: &[DefinedInEdge]) -> Result<usize, GraphWriteError>;
}
