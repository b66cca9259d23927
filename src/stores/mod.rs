//! Vector storage for chunked filing text.
//!
//! The [`VectorStore`] trait is the capability seam between the pipeline and
//! whatever index backs it: an exact in-memory scan today
//! ([`flat::FlatVectorStore`]), an approximate or disk-backed index later,
//! without touching the retriever or orchestrator.

pub mod flat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::edgar::Filing;
use crate::types::StoreError;

pub use flat::FlatVectorStore;

/// A chunk of filing text with the identifiers of the filing it came from.
///
/// Records are paired positionally with embedding vectors at insertion time
/// and returned (copied) from queries; stored records are never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this chunk.
    pub id: String,
    /// Central index key of the company the filing belongs to.
    pub cik: String,
    /// Filing type as listed by EDGAR, e.g. `10-K` or `10-K/A`.
    pub filing_type: String,
    /// Accession number of the filing.
    pub accession: String,
    /// Filing date as reported by EDGAR.
    pub filing_date: String,
    /// URL of the source document.
    pub source_url: String,
    /// Zero-based position of this chunk within its filing.
    pub chunk_index: usize,
    /// The chunk text itself.
    pub content: String,
}

impl ChunkRecord {
    /// Builds a record for one chunk of a filing, assigning a fresh id.
    pub fn from_filing(filing: &Filing, chunk_index: usize, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            cik: filing.cik.clone(),
            filing_type: filing.filing_type.clone(),
            accession: filing.accession.clone(),
            filing_date: filing.date.clone(),
            source_url: filing.document_url.to_string(),
            chunk_index,
            content: content.into(),
        }
    }
}

/// A query hit: a copy of the stored record plus its distance to the query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    /// Distance from the query vector; smaller is closer.
    pub score: f32,
}

/// Distance function used to rank stored vectors against a query.
///
/// Both metrics order ascending, so `0` is the identity value for a vector
/// compared with itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    SquaredL2,
    /// Cosine distance, `1 - cos(a, b)`.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two equal-length vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::SquaredL2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (norm_a * norm_b)
                }
            }
        }
    }
}

/// Capability interface for vector indexes.
///
/// Implementations must keep vectors and metadata records index-aligned and
/// must not partially apply a failed `add`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends vectors with their positionally paired metadata records.
    ///
    /// Fails with [`StoreError::ArityMismatch`] when the two collections
    /// have different lengths, and with [`StoreError::DimensionMismatch`]
    /// when any vector's length differs from the index dimensionality
    /// (established by the first inserted vector). On failure the index is
    /// unchanged.
    async fn add(
        &self,
        vectors: Vec<Vec<f32>>,
        records: Vec<ChunkRecord>,
    ) -> Result<(), StoreError>;

    /// Returns the `top_k` stored records closest to `vector`, ascending by
    /// distance with ties broken by insertion order.
    ///
    /// Fails with [`StoreError::EmptyIndex`] when nothing is stored. When
    /// `top_k` exceeds the stored count, every entry is returned.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Number of stored vectors.
    async fn len(&self) -> usize;

    /// Returns `true` when nothing is stored.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
