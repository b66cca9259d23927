//! Exact in-memory vector index.
//!
//! Vectors live in a linear array with a parallel metadata array; queries
//! scan every stored vector, O(n·d), which is plenty at the scale of one
//! filing set. The arrays stay index-aligned because `add` runs under a
//! write lock while queries take read locks.

use parking_lot::RwLock;

use super::{ChunkRecord, DistanceMetric, ScoredChunk, VectorStore};
use crate::types::StoreError;

#[derive(Default)]
struct Inner {
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
    records: Vec<ChunkRecord>,
}

/// Brute-force flat index over fixed-dimension `f32` vectors.
///
/// The dimensionality is established by the first inserted vector; every
/// later vector must match it. Vectors and records are discarded with the
/// store; nothing is persisted.
pub struct FlatVectorStore {
    metric: DistanceMetric,
    inner: RwLock<Inner>,
}

impl FlatVectorStore {
    /// Creates an empty index using `metric` for ranking.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Metric this index ranks with.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Dimensionality of stored vectors, `None` until the first insert.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }

    /// Appends vectors and records after validating the whole batch, so a
    /// rejected batch leaves the index untouched.
    pub fn add_vectors(
        &self,
        vectors: Vec<Vec<f32>>,
        records: Vec<ChunkRecord>,
    ) -> Result<(), StoreError> {
        if vectors.len() != records.len() {
            return Err(StoreError::ArityMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }
        if vectors.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();
        let expected = inner
            .dimension
            .unwrap_or_else(|| vectors[0].len());
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        inner.dimension = Some(expected);
        inner.vectors.extend(vectors);
        inner.records.extend(records);
        Ok(())
    }

    /// Scans every stored vector and returns the `top_k` closest records,
    /// ascending by distance. The sort is stable, so equal distances keep
    /// insertion order.
    pub fn nearest(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let inner = self.inner.read();
        let Some(expected) = inner.dimension else {
            return Err(StoreError::EmptyIndex);
        };
        if vector.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = inner
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, stored)| (idx, self.metric.distance(stored, vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| ScoredChunk {
                record: inner.records[idx].clone(),
                score,
            })
            .collect())
    }

    /// Number of stored vectors.
    pub fn count(&self) -> usize {
        self.inner.read().vectors.len()
    }
}

#[async_trait::async_trait]
impl VectorStore for FlatVectorStore {
    async fn add(
        &self,
        vectors: Vec<Vec<f32>>,
        records: Vec<ChunkRecord>,
    ) -> Result<(), StoreError> {
        self.add_vectors(vectors, records)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        self.nearest(vector, top_k)
    }

    async fn len(&self) -> usize {
        self.count()
    }
}
