//! Filing discovery and download against SEC EDGAR.
//!
//! Discovery scrapes the browse page for a company (one request per filing
//! type), then follows each result's `-index.html` page to the real filing
//! document. EDGAR rejects requests without a descriptive `User-Agent`, so
//! the client requires one up front.

use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::PipelineError;

/// One filing discovered on EDGAR.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Filing {
    pub cik: String,
    /// Type as listed, e.g. `10-K` or `10-K/A`.
    pub filing_type: String,
    /// Accession number, taken from the index page file name.
    pub accession: String,
    /// Filing date as shown on the browse page.
    pub date: String,
    /// Direct URL of the filing document.
    pub document_url: Url,
}

/// HTTP client for EDGAR browse and archive pages.
#[derive(Clone, Debug)]
pub struct EdgarClient {
    client: Client,
    base_url: Url,
}

impl EdgarClient {
    /// Builds a client rooted at `base_url` (normally `https://www.sec.gov`)
    /// sending `user_agent` on every request.
    pub fn new(base_url: Url, user_agent: &str) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .use_rustls_tls()
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Discovers filings of the given types for a company.
    ///
    /// Returns one [`Filing`] per matching row, in browse-page order per
    /// filing type. An unknown CIK or an over-narrow filter simply yields an
    /// empty list; the pipeline decides whether that is fatal.
    pub async fn fetch_filings(
        &self,
        cik: &str,
        filing_types: &[String],
    ) -> Result<Vec<Filing>, PipelineError> {
        let padded = pad_cik(cik);
        let mut filings = Vec::new();

        for filing_type in filing_types {
            let browse_url = self.browse_url(&padded, filing_type)?;
            tracing::debug!(url = %browse_url, "fetching EDGAR browse page");
            let body = self.get_text(browse_url).await?;

            for row in parse_browse_rows(&body, filing_type) {
                let index_url = self
                    .base_url
                    .join(&row.index_href)
                    .map_err(|err| PipelineError::InvalidDocument(err.to_string()))?;
                let index_body = self.get_text(index_url).await?;
                let Some(doc_href) = parse_index_document_href(&index_body) else {
                    continue;
                };
                let document_url = self
                    .base_url
                    .join(&doc_href)
                    .map_err(|err| PipelineError::InvalidDocument(err.to_string()))?;

                filings.push(Filing {
                    cik: cik.to_string(),
                    filing_type: row.filing_type,
                    accession: row.accession,
                    date: row.date,
                    document_url,
                });
            }
        }

        Ok(filings)
    }

    /// Downloads a filing document body.
    pub async fn fetch_document(&self, url: &Url) -> Result<String, PipelineError> {
        self.get_text(url.clone()).await
    }

    fn browse_url(&self, padded_cik: &str, filing_type: &str) -> Result<Url, PipelineError> {
        let mut url = self
            .base_url
            .join("/cgi-bin/browse-edgar")
            .map_err(|err| PipelineError::InvalidDocument(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("action", "getcompany")
            .append_pair("CIK", padded_cik)
            .append_pair("type", filing_type)
            .append_pair("count", "100")
            .append_pair("owner", "exclude");
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, PipelineError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Zero-pads a numeric CIK to the ten digits EDGAR expects; non-numeric
/// input is passed through untouched.
fn pad_cik(cik: &str) -> String {
    match cik.trim().parse::<u64>() {
        Ok(numeric) => format!("{numeric:010}"),
        Err(_) => cik.trim().to_string(),
    }
}

struct BrowseRow {
    filing_type: String,
    index_href: String,
    accession: String,
    date: String,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Pulls matching rows out of a browse page's filings table.
///
/// Rows whose type cell does not start with the requested type are skipped,
/// as are malformed rows; a page without the table yields nothing.
fn parse_browse_rows(body: &str, filing_type: &str) -> Vec<BrowseRow> {
    let document = Html::parse_document(body);
    let row_sel = selector("table.tableFile2 tr");
    let cell_sel = selector("td");
    let link_sel = selector("a");
    let wanted = filing_type.to_uppercase();

    let mut rows = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 4 {
            continue;
        }
        let row_type = cell_text(&cells[0]);
        if !row_type.to_uppercase().starts_with(&wanted) {
            continue;
        }
        let Some(href) = cells[1]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let accession = href
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .replace("-index.html", "");

        rows.push(BrowseRow {
            filing_type: row_type,
            index_href: href.to_string(),
            accession,
            date: cell_text(&cells[3]),
        });
    }
    rows
}

/// First document link on a filing's index page, if the page has the
/// expected documents table.
fn parse_index_document_href(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let row_sel = selector("table.tableFile tr");
    let link_sel = selector("a");

    document
        .select(&row_sel)
        .nth(1)
        .and_then(|row| {
            row.select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })
}

fn cell_text(cell: &scraper::ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const BROWSE_PAGE: &str = r#"
        <html><body>
        <table class="tableFile2">
          <tr><th>Filings</th><th>Format</th><th>Description</th><th>Date</th></tr>
          <tr>
            <td>10-K</td>
            <td><a href="/Archives/edgar/data/789019/000078901925000049/0000789019-25-000049-index.html">Documents</a></td>
            <td>Annual report</td>
            <td>2025-01-30</td>
          </tr>
          <tr>
            <td>10-K/A</td>
            <td><a href="/Archives/edgar/data/789019/000078901924000012/0000789019-24-000012-index.html">Documents</a></td>
            <td>Amended annual report</td>
            <td>2024-02-01</td>
          </tr>
          <tr>
            <td>8-K</td>
            <td><a href="/Archives/edgar/data/789019/000078901925000100/0000789019-25-000100-index.html">Documents</a></td>
            <td>Current report</td>
            <td>2025-03-02</td>
          </tr>
        </table>
        </body></html>"#;

    const INDEX_PAGE: &str = r#"
        <html><body>
        <table class="tableFile">
          <tr><th>Seq</th><th>Description</th><th>Document</th></tr>
          <tr><td>1</td><td>10-K</td><td><a href="/Archives/edgar/data/789019/msft-10k.htm">msft-10k.htm</a></td></tr>
          <tr><td>2</td><td>Exhibit</td><td><a href="/Archives/edgar/data/789019/ex-21.htm">ex-21.htm</a></td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn browse_rows_match_on_type_prefix() {
        let rows = parse_browse_rows(BROWSE_PAGE, "10-K");
        assert_eq!(rows.len(), 2, "10-K matches 10-K and 10-K/A but not 8-K");
        assert_eq!(rows[0].filing_type, "10-K");
        assert_eq!(rows[0].accession, "0000789019-25-000049");
        assert_eq!(rows[0].date, "2025-01-30");
        assert_eq!(rows[1].filing_type, "10-K/A");
    }

    #[test]
    fn pages_without_the_filings_table_yield_nothing() {
        assert!(parse_browse_rows("<html><body>No results.</body></html>", "10-K").is_empty());
    }

    #[test]
    fn index_page_first_document_row_wins() {
        let href = parse_index_document_href(INDEX_PAGE).unwrap();
        assert_eq!(href, "/Archives/edgar/data/789019/msft-10k.htm");
    }

    #[test]
    fn cik_is_zero_padded_to_ten_digits() {
        assert_eq!(pad_cik("789019"), "0000789019");
        assert_eq!(pad_cik(" 789019 "), "0000789019");
        assert_eq!(pad_cik("not-a-cik"), "not-a-cik");
    }

    #[tokio::test]
    async fn fetch_filings_follows_index_pages() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cgi-bin/browse-edgar")
                    .query_param("CIK", "0000789019")
                    .query_param("type", "10-K");
                then.status(200).body(BROWSE_PAGE);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path_contains("-index.html");
                then.status(200).body(INDEX_PAGE);
            })
            .await;

        let client = EdgarClient::new(
            Url::parse(&server.base_url()).unwrap(),
            "filingsmith test agent",
        )
        .unwrap();
        let filings = client
            .fetch_filings("789019", &["10-K".to_string()])
            .await
            .unwrap();

        assert_eq!(filings.len(), 2);
        assert_eq!(filings[0].cik, "789019");
        assert_eq!(filings[0].accession, "0000789019-25-000049");
        assert!(
            filings[0]
                .document_url
                .path()
                .ends_with("msft-10k.htm")
        );
    }

    #[tokio::test]
    async fn non_success_status_surfaces_as_upstream_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cgi-bin/browse-edgar");
                then.status(403);
            })
            .await;

        let client = EdgarClient::new(
            Url::parse(&server.base_url()).unwrap(),
            "filingsmith test agent",
        )
        .unwrap();
        let err = client
            .fetch_filings("789019", &["10-K".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(_)));
    }
}
