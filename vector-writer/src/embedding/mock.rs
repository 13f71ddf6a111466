//! Deterministic hash-based embedder, selected via `USE_MOCK_EMBEDDING=1`.
//! Makes the pipeline runnable and testable without network access.

use super::EmbeddingProvider;
use crate::model::Result;
use async_trait::async_trait;
use sha1::{Digest, Sha1};

pub struct MockEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, texts: &[String], dimension: usize) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vector(t, dimension)).collect())
    }
}

/// Derives a unit-ish vector deterministically from `text`'s SHA-1 digest,
/// expanding the 20-byte digest to `dimension` floats by re-hashing with an
/// incrementing salt.
fn hash_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(dimension);
    let mut salt = 0u32;
    while out.len() < dimension {
        let mut hasher = Sha1::new();
        hasher.update(text.as_bytes());
        hasher.update(salt.to_le_bytes());
        let digest = hasher.finalize();
        for byte in digest {
            if out.len() >= dimension {
                break;
            }
            out.push((byte as f32 / 255.0) * 2.0 - 1.0);
        }
        salt += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_hashes_to_same_vector() {
        let provider = MockEmbeddingProvider;
        let a = provider.embed(&["hello".to_string()], 8).await.unwrap();
        let b = provider.embed(&["hello".to_string()], 8).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 8);
    }

    #[tokio::test]
    async fn different_text_hashes_differ() {
        let provider = MockEmbeddingProvider;
        let a = provider.embed(&["hello".to_string()], 8).await.unwrap();
        let b = provider.embed(&["world".to_string()], 8).await.unwrap();
        assert_ne!(a, b);
    }
}
