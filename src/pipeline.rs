//! End-to-end orchestration.
//!
//! A run walks a fixed, linear sequence: discover filings, fetch and
//! normalize each document, split it into sections, chunk each section into
//! token windows, embed and index the chunks, retrieve the chunks closest
//! to the query, extract schema records from them, and tabulate. There is
//! no partial-result path: a run either yields a fully populated table or
//! an error naming the probable cause.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunker::TokenChunker;
use crate::config::PipelineConfig;
use crate::edgar::EdgarClient;
use crate::embedder::{EmbeddingProvider, OpenAiEmbedder};
use crate::extractor::{FieldExtractor, OpenAiExtractor};
use crate::preprocess::{html_to_text, split_sections};
use crate::retriever::Retriever;
use crate::stores::{ChunkRecord, FlatVectorStore, VectorStore};
use crate::table::DataTable;
use crate::types::PipelineError;

/// Counters describing one pipeline run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub filings_discovered: usize,
    pub filings_fetched: usize,
    /// Filings skipped because their document fetch failed.
    pub filings_skipped: usize,
    pub sections_split: usize,
    pub chunks_indexed: usize,
    pub chunks_retrieved: usize,
    pub rows_extracted: usize,
}

/// The table produced by a run, together with its counters.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub table: DataTable,
    pub stats: RunStats,
}

/// Sequences the whole retrieval-and-extraction flow.
///
/// The vector index lives only for the duration of one [`run`](Self::run);
/// repeated runs start from an empty index.
pub struct FilingPipeline {
    config: PipelineConfig,
    edgar: EdgarClient,
    chunker: TokenChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn FieldExtractor>,
}

impl FilingPipeline {
    /// Wires the pipeline with OpenAI-backed embedding and extraction
    /// clients built from `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let embedder = Arc::new(OpenAiEmbedder::new(&config)?);
        let extractor = Arc::new(OpenAiExtractor::new(&config)?);
        Self::with_providers(config, embedder, extractor)
    }

    /// Wires the pipeline with caller-supplied embedding and extraction
    /// providers.
    pub fn with_providers(
        config: PipelineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Result<Self, PipelineError> {
        let edgar = EdgarClient::new(config.edgar_base_url.clone(), &config.edgar_user_agent)?;
        let chunker = TokenChunker::new()?;
        Ok(Self {
            config,
            edgar,
            chunker,
            embedder,
            extractor,
        })
    }

    /// Runs the pipeline for one company and one query.
    pub async fn run(&self, query: &str, cik: &str) -> Result<RunOutcome, PipelineError> {
        let mut stats = RunStats::default();

        let filings = self
            .edgar
            .fetch_filings(cik, &self.config.filing_types)
            .await?;
        if filings.is_empty() {
            return Err(PipelineError::NoFilingsFound {
                cik: cik.to_string(),
                filing_types: self.config.filing_types.join("/"),
            });
        }
        stats.filings_discovered = filings.len();
        tracing::info!(cik = %cik, count = filings.len(), "discovered filings");

        let store = FlatVectorStore::new(self.config.metric);
        for filing in &filings {
            let html = match self.edgar.fetch_document(&filing.document_url).await {
                Ok(html) => html,
                Err(err) => {
                    // A single unreachable document should not sink the run.
                    tracing::warn!(
                        url = %filing.document_url,
                        error = %err,
                        "skipping filing: document fetch failed"
                    );
                    stats.filings_skipped += 1;
                    continue;
                }
            };
            stats.filings_fetched += 1;

            let text = html_to_text(&html);
            let mut chunk_index = 0usize;
            for section in split_sections(&text) {
                stats.sections_split += 1;
                let chunks = self.chunker.chunk(
                    &section,
                    self.config.chunk_size,
                    self.config.chunk_overlap,
                )?;
                if chunks.is_empty() {
                    continue;
                }

                let vectors = self.embedder.embed(&chunks).await?;
                let records: Vec<ChunkRecord> = chunks
                    .into_iter()
                    .map(|content| {
                        let record = ChunkRecord::from_filing(filing, chunk_index, content);
                        chunk_index += 1;
                        record
                    })
                    .collect();
                stats.chunks_indexed += records.len();
                store.add(vectors, records).await?;
            }
            tracing::debug!(
                accession = %filing.accession,
                chunks = chunk_index,
                "indexed filing"
            );
        }

        if store.is_empty().await {
            return Err(PipelineError::NoChunksIndexed);
        }
        tracing::info!(chunks = stats.chunks_indexed, "index built");

        let retriever = Retriever::new(self.embedder.clone(), Arc::new(store));
        let hits = retriever.retrieve(query, self.config.top_k).await?;
        stats.chunks_retrieved = hits.len();
        tracing::info!(hits = hits.len(), "retrieved chunks for query");

        let records = self.extractor.extract(&self.config.schema, &hits).await?;
        stats.rows_extracted = records.len();
        let table = DataTable::from_records(&self.config.schema, &records)?;

        Ok(RunOutcome { table, stats })
    }
}
