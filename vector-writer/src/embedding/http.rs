//! Generic OpenAI-compatible batch embeddings client (`POST {endpoint}/v1/embeddings`).

use super::EmbeddingProvider;
use crate::model::{Result, VectorWriteError};
use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() || !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(VectorWriteError::Config(format!("invalid embedding endpoint: {endpoint}")));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| VectorWriteError::Config(format!("invalid api key header: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| VectorWriteError::Config(format!("failed to build http client: {e}")))?;

        let url = format!("{}/v1/embeddings", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            model: model.to_string(),
            url,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, texts: &[String], dimension: usize) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        debug!(batch = texts.len(), url = %self.url, "POST embeddings batch");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorWriteError::Provider(format!("transport error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(%status, snippet = %text.chars().take(200).collect::<String>(), "embeddings endpoint returned error");
            return Err(classify_status(status, text));
        }

        let out: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| VectorWriteError::Provider(format!("failed to decode embeddings response: {e}")))?;

        let vectors: Vec<Vec<f32>> = out.data.into_iter().map(|item| item.embedding).collect();

        if vectors.len() != texts.len() {
            return Err(VectorWriteError::EmbeddingCountMismatch {
                got: vectors.len(),
                want: texts.len(),
            });
        }
        for v in &vectors {
            if v.len() != dimension {
                return Err(VectorWriteError::VectorDimensionMismatch {
                    got: v.len(),
                    want: dimension,
                });
            }
        }

        Ok(vectors)
    }
}

/// Retries are reserved for transient failures (rate limits, 5xx); auth and
/// malformed-request errors surface immediately.
fn classify_status(status: StatusCode, snippet: String) -> VectorWriteError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        VectorWriteError::Provider(format!("transient http status {status}: {snippet}"))
    } else {
        VectorWriteError::Config(format!("non-retryable http status {status}: {snippet}"))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}
