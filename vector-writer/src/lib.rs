//! Embeds extracted entities and upserts them into the configured vector
//! store: dual-budget batching, one embed call per batch, idempotent
//! UUIDv5-keyed upsert with bounded retry.

pub mod batch;
pub mod config;
pub mod embedding;
pub mod model;
pub mod store;
pub mod writer;

pub use batch::batch_entities;
pub use config::VectorWriterConfig;
pub use embedding::{http::HttpEmbeddingProvider, mock::MockEmbeddingProvider, EmbeddingProvider};
pub use model::{build_point, embedding_text, truncate, Distance, Point, VectorWriteError, VectorWriteStats};
pub use store::{in_memory::InMemoryVectorStore, qdrant::QdrantVectorStore, VectorStore};
pub use writer::VectorWriter;
