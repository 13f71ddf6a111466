//! Point/payload construction and error/metrics types shared across the
//! batching, embedding, and store layers.

use entity_extractor::EntityRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VectorWriteError {
    #[error("config error: {0}")]
    Config(String),
    #[error("embedding provider error: {0}")]
    Provider(String),
    #[error("vector store error: {0}")]
    Store(String),
    #[error("embedded vector count mismatch: got={got}, want={want}")]
    EmbeddingCountMismatch { got: usize, want: usize },
    #[error("vector dimension mismatch: got={got}, want={want}")]
    VectorDimensionMismatch { got: usize, want: usize },
    #[error("refusing to reuse collection with vector size {existing}, requested {requested}")]
    DimensionConflict { existing: usize, requested: usize },
}

impl VectorWriteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, VectorWriteError::Provider(_) | VectorWriteError::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, VectorWriteError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// `docstring ‖ "\n" ‖ code_text` when a docstring is present, else just
/// `code_text`.
pub fn embedding_text(entity: &EntityRecord) -> String {
    match &entity.docstring {
        Some(doc) if !doc.is_empty() => format!("{doc}\n{}", entity.code_text),
        _ => entity.code_text.clone(),
    }
}

/// Truncation is unconditional and silent: texts longer than `max_chars` are
/// sliced to that length before embedding.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

pub fn build_point(entity: &EntityRecord, vector: Vec<f32>) -> Point {
    let identity_key = entity.identity_key();
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, identity_key.as_bytes());

    let mut payload = HashMap::new();
    payload.insert("global_uri".to_string(), serde_json::Value::String(entity.global_uri.clone()));
    payload.insert("identity_key".to_string(), serde_json::Value::String(identity_key));
    payload.insert("repo_name".to_string(), serde_json::Value::String(entity.repo_name.clone()));
    payload.insert("file_path".to_string(), serde_json::Value::String(entity.file_path.clone()));
    payload.insert(
        "entity_type".to_string(),
        serde_json::Value::String(entity.entity_type.to_string()),
    );
    payload.insert("entity_name".to_string(), serde_json::Value::String(entity.entity_name.clone()));
    payload.insert("start_line".to_string(), serde_json::json!(entity.start_line));
    payload.insert("end_line".to_string(), serde_json::json!(entity.end_line));
    payload.insert("is_templated".to_string(), serde_json::Value::Bool(entity.is_templated));
    if let Some(doc) = &entity.docstring {
        payload.insert("docstring".to_string(), serde_json::Value::String(doc.clone()));
    }
    if let Some(sig) = &entity.function_sig_hash {
        payload.insert("function_sig_hash".to_string(), serde_json::Value::String(sig.clone()));
    }

    Point { id, vector, payload }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VectorWriteStats {
    pub points_prepared: usize,
    pub points_upserted: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub embedding_failures: usize,
    pub embedding_count_mismatch: usize,
    pub vector_dimension_mismatch: usize,
    pub upsert_failed: usize,
    pub retry_attempts: usize,
    pub errors: Vec<String>,
}
