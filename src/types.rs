//! Crate-wide error taxonomy.
//!
//! Two layers: [`StoreError`] covers contract violations against the vector
//! index and is recoverable by callers that check preconditions first;
//! [`PipelineError`] is the top-level error for a pipeline run, where the
//! discovery/indexing variants are fatal and carry a message naming the
//! probable cause.

use thiserror::Error;

/// Errors raised by vector index operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A vector's length differs from the index dimensionality established
    /// by the first inserted vector.
    #[error("vector dimension mismatch: index stores {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vectors and metadata records were supplied in unequal numbers.
    #[error("{vectors} vectors paired with {records} metadata records")]
    ArityMismatch { vectors: usize, records: usize },

    /// A query was issued against an index with no stored vectors.
    #[error("cannot query an empty index")]
    EmptyIndex,
}

/// Top-level error for filing retrieval and extraction runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Discovery produced zero filings. Fatal: signals a bad CIK, a filter
    /// that is too narrow, or a rejected user agent.
    #[error(
        "no {filing_types} filings found for CIK {cik}; check the CIK, the \
         filing-type filter, and EDGAR_USER_AGENT"
    )]
    NoFilingsFound { cik: String, filing_types: String },

    /// Filings were fetched but nothing was chunked and indexed. Fatal:
    /// usually means the document URLs did not point at raw filing HTML.
    #[error(
        "filings were fetched but no text sections were chunked and indexed; \
         verify the document URLs point at the raw filing HTML"
    )]
    NoChunksIndexed,

    /// A network call or non-success HTTP status from an external service.
    /// Propagated immediately; the pipeline does not retry.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tokenizer vocabulary load or token decode failure.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Chunk window parameters that cannot make progress.
    #[error("invalid chunk window: size {size} must be positive and greater than overlap {overlap}")]
    InvalidWindow { size: usize, overlap: usize },

    /// A document or URL that could not be parsed.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A well-formed HTTP response whose body did not match the expected
    /// shape (missing tool call, wrong vector count, unparsable arguments).
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// The extraction output violated the schema contract.
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("configuration error: {0}")]
    Config(String),
}
