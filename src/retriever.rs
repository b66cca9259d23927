//! Query-side retrieval: embed a query, rank stored chunks against it.

use std::sync::Arc;

use crate::embedder::EmbeddingProvider;
use crate::stores::{ScoredChunk, VectorStore};
use crate::types::PipelineError;

/// Embeds query text and delegates to the vector store's top-k lookup.
///
/// Holds no state beyond its two collaborators; results are deterministic
/// given a deterministic embedder and fixed index contents.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Returns the `top_k` stored chunks closest to `query`, ascending by
    /// distance.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            PipelineError::MalformedResponse(
                "embedding service returned no vector for the query".to_string(),
            )
        })?;
        Ok(self.store.query(&vector, top_k).await?)
    }
}
