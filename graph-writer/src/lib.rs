//! Converts parsed SCIP symbols into a typed property graph and upserts it
//! into the configured graph store in three batched phases: entity nodes,
//! relationship edges, then file nodes and `DEFINED_IN` edges.

pub mod backend;
pub mod build;
pub mod errors;
pub mod model;
pub mod writer;

pub use backend::{in_memory::InMemoryGraphStore, neo4j::Neo4jGraphStore, GraphStore};
pub use build::{build_graph, BuildOutput, DropCounters};
pub use errors::GraphWriteError;
pub use model::{allowed_pair, DefinedInEdge, FileNode, GraphEdge, GraphNode, RelationshipType};
pub use writer::{GraphWriteStats, GraphWriter, GraphWriterConfig};
