//! Embedding providers.
//!
//! [`EmbeddingProvider`] is the seam the retriever and pipeline depend on;
//! [`OpenAiEmbedder`] talks to an OpenAI-compatible embeddings endpoint and
//! [`HashEmbedder`] produces deterministic vectors for tests and offline
//! runs.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::types::PipelineError;

/// Converts text to fixed-dimension vectors, one per input, preserving
/// order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

/// Embeddings client for OpenAI-compatible endpoints.
///
/// Non-success statuses are surfaced immediately as upstream errors; there
/// is no retry policy.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = build_authorized_client(&config.openai_api_key)?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/embeddings",
                config.openai_api_base.trim_end_matches('/')
            ),
            model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let mut parsed: EmbeddingResponse = response.json().await?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(PipelineError::MalformedResponse(format!(
                "embedding service returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

/// Deterministic embedding provider derived from a text hash.
///
/// Identical inputs always produce identical vectors, which makes
/// nearest-neighbor assertions exact in tests.
#[derive(Clone, Debug)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimensions: 8 }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(inputs
            .iter()
            .map(|text| hash_to_vec(text, self.dimensions))
            .collect())
    }
}

fn hash_to_vec(text: &str, dimensions: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dimensions)
        .map(|i| {
            let bits = seed.rotate_left((i % 8) as u32 * 8) ^ ((i as u64) << 24);
            (bits as f32) / u32::MAX as f32
        })
        .collect()
}

pub(crate) fn build_authorized_client(api_key: &str) -> Result<Client, PipelineError> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
        .map_err(|err| PipelineError::Config(format!("invalid API key: {err}")))?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(Client::builder()
        .default_headers(headers)
        .use_rustls_tls()
        .build()?)
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
    index: usize,
}
