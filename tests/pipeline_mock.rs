//! End-to-end pipeline tests against a mocked EDGAR server, deterministic
//! hash embeddings, and a stubbed extractor. No real network or model calls,
//! suitable for CI.

use std::sync::Arc;

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::{Map, Value, json};
use url::Url;

use filingsmith::{
    ExtractionSchema, FieldExtractor, FilingPipeline, HashEmbedder, PipelineConfig, PipelineError,
    ScoredChunk,
};

const BROWSE_PAGE: &str = r#"
    <html><body>
    <table class="tableFile2">
      <tr><th>Filings</th><th>Format</th><th>Description</th><th>Date</th></tr>
      <tr>
        <td>10-K</td>
        <td><a href="/Archives/filing-one-index.html">Documents</a></td>
        <td>Annual report</td>
        <td>2025-01-30</td>
      </tr>
      <tr>
        <td>10-K</td>
        <td><a href="/Archives/filing-two-index.html">Documents</a></td>
        <td>Annual report</td>
        <td>2024-01-25</td>
      </tr>
    </table>
    </body></html>"#;

fn index_page(doc: &str) -> String {
    format!(
        r#"<html><body>
        <table class="tableFile">
          <tr><th>Seq</th><th>Description</th><th>Document</th></tr>
          <tr><td>1</td><td>10-K</td><td><a href="/Archives/{doc}">{doc}</a></td></tr>
        </table>
        </body></html>"#
    )
}

fn filing_document(flavor: &str) -> String {
    let body = format!(
        "Item 7. Management discussion about {flavor}. The price target was \
         raised following strong results. "
    )
    .repeat(12);
    format!("<html><body><p>{body}</p></body></html>")
}

/// Extractor that records what it was handed and returns canned rows.
struct StubExtractor {
    rows: Vec<Map<String, Value>>,
}

impl StubExtractor {
    fn with_rows(rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.as_object().cloned().expect("stub rows are objects"))
            .collect();
        Self { rows }
    }
}

#[async_trait]
impl FieldExtractor for StubExtractor {
    async fn extract(
        &self,
        _schema: &ExtractionSchema,
        chunks: &[ScoredChunk],
    ) -> Result<Vec<Map<String, Value>>, PipelineError> {
        assert!(!chunks.is_empty(), "extractor should receive chunks");
        for pair in chunks.windows(2) {
            assert!(pair[0].score <= pair[1].score, "hits arrive ranked");
        }
        Ok(self.rows.clone())
    }
}

fn mock_config(server: &MockServer) -> PipelineConfig {
    PipelineConfig::new("sk-test", "filingsmith integration test")
        .with_edgar_base_url(Url::parse(&server.base_url()).unwrap())
        .with_filing_types(["10-K"])
        .with_chunk_window(64, 16)
        .with_top_k(3)
}

async fn mount_edgar(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cgi-bin/browse-edgar");
            then.status(200).body(BROWSE_PAGE);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/filing-one-index.html");
            then.status(200).body(index_page("doc-one.htm"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/filing-two-index.html");
            then.status(200).body(index_page("doc-two.htm"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/doc-one.htm");
            then.status(200).body(filing_document("cloud revenue"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/doc-two.htm");
            then.status(200).body(filing_document("device margins"));
        })
        .await;
}

#[tokio::test]
async fn full_run_produces_a_typed_table() {
    let server = MockServer::start_async().await;
    mount_edgar(&server).await;

    let extractor = StubExtractor::with_rows(vec![
        json!({"Date": "2025-01-30", "Ticker": "MSFT", "Direction": "raised"}),
        json!({"Date": "2024-01-25", "Ticker": "MSFT", "Direction": "lowered"}),
    ]);
    let pipeline = FilingPipeline::with_providers(
        mock_config(&server),
        Arc::new(HashEmbedder::default()),
        Arc::new(extractor),
    )
    .unwrap();

    let outcome = pipeline
        .run("price target direction", "789019")
        .await
        .unwrap();

    assert_eq!(outcome.stats.filings_discovered, 2);
    assert_eq!(outcome.stats.filings_fetched, 2);
    assert_eq!(outcome.stats.filings_skipped, 0);
    assert!(outcome.stats.chunks_indexed > 0);
    assert_eq!(outcome.stats.chunks_retrieved, 3);
    assert_eq!(outcome.stats.rows_extracted, 2);

    let table = &outcome.table;
    assert_eq!(table.num_rows(), 2);
    let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Date", "Ticker", "Direction"]);
}

#[tokio::test]
async fn zero_filings_is_fatal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cgi-bin/browse-edgar");
            then.status(200)
                .body("<html><body>No matching filings.</body></html>");
        })
        .await;

    let pipeline = FilingPipeline::with_providers(
        mock_config(&server),
        Arc::new(HashEmbedder::default()),
        Arc::new(StubExtractor::with_rows(vec![])),
    )
    .unwrap();

    let err = pipeline.run("anything", "789019").await.unwrap_err();
    assert!(matches!(err, PipelineError::NoFilingsFound { .. }));
    assert!(err.to_string().contains("789019"));
}

#[tokio::test]
async fn documents_without_sections_are_fatal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cgi-bin/browse-edgar");
            then.status(200).body(BROWSE_PAGE);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("-index.html");
            then.status(200).body(index_page("doc-one.htm"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("doc-one.htm");
            then.status(200)
                .body("<html><body><p>Prose with no heading markers at all.</p></body></html>");
        })
        .await;

    let pipeline = FilingPipeline::with_providers(
        mock_config(&server),
        Arc::new(HashEmbedder::default()),
        Arc::new(StubExtractor::with_rows(vec![])),
    )
    .unwrap();

    let err = pipeline.run("anything", "789019").await.unwrap_err();
    assert!(matches!(err, PipelineError::NoChunksIndexed));
}

#[tokio::test]
async fn failed_document_fetch_skips_the_filing_but_not_the_run() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cgi-bin/browse-edgar");
            then.status(200).body(BROWSE_PAGE);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/filing-one-index.html");
            then.status(200).body(index_page("doc-one.htm"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/filing-two-index.html");
            then.status(200).body(index_page("doc-two.htm"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/doc-one.htm");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Archives/doc-two.htm");
            then.status(200).body(filing_document("device margins"));
        })
        .await;

    let extractor = StubExtractor::with_rows(vec![json!({
        "Date": "2024-01-25", "Ticker": "MSFT", "Direction": "lowered"
    })]);
    let pipeline = FilingPipeline::with_providers(
        mock_config(&server),
        Arc::new(HashEmbedder::default()),
        Arc::new(extractor),
    )
    .unwrap();

    let outcome = pipeline.run("price target", "789019").await.unwrap();
    assert_eq!(outcome.stats.filings_skipped, 1);
    assert_eq!(outcome.stats.filings_fetched, 1);
    assert!(outcome.stats.chunks_indexed > 0);
    assert_eq!(outcome.table.num_rows(), 1);
}
