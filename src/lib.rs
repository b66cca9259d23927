//! Retrieval-augmented extraction over SEC EDGAR filings.
//!
//! ```text
//! Company CIK ──► edgar::EdgarClient ──► Filing records
//!                                          │
//! Filing HTML ──► preprocess::html_to_text ──► preprocess::split_sections
//!                                          │
//! Section text ──► chunker::TokenChunker ──► overlapping token windows
//!                                          │
//! Chunks ──► embedder::EmbeddingProvider ──► stores::FlatVectorStore
//!                                          │
//! Query ──► retriever::Retriever ──► extractor::FieldExtractor
//!                                          │
//!                                  table::DataTable
//! ```
//!
//! [`pipeline::FilingPipeline`] sequences the stages; everything above the
//! pipeline is usable on its own.

pub mod chunker;
pub mod config;
pub mod edgar;
pub mod embedder;
pub mod extractor;
pub mod pipeline;
pub mod preprocess;
pub mod retriever;
pub mod stores;
pub mod table;
pub mod types;

pub use chunker::TokenChunker;
pub use config::PipelineConfig;
pub use edgar::{EdgarClient, Filing};
pub use embedder::{EmbeddingProvider, HashEmbedder, OpenAiEmbedder};
pub use extractor::{ExtractionSchema, Field, FieldExtractor, FieldKind, OpenAiExtractor};
pub use pipeline::{FilingPipeline, RunOutcome, RunStats};
pub use retriever::Retriever;
pub use stores::{ChunkRecord, DistanceMetric, FlatVectorStore, ScoredChunk, VectorStore};
pub use table::{Column, ColumnData, DataTable};
pub use types::{PipelineError, StoreError};
