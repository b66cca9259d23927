//! Pipeline configuration.
//!
//! One explicit configuration object, built at process entry and handed to
//! each collaborator's constructor. [`PipelineConfig::from_env`] reads a
//! `.env` file (if present) and the process environment; nothing global or
//! mutable is kept.

use std::env;

use url::Url;

use crate::extractor::ExtractionSchema;
use crate::stores::DistanceMetric;
use crate::types::PipelineError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_EDGAR_BASE_URL: &str = "https://www.sec.gov";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Tokens per chunk.
    pub chunk_size: usize,
    /// Token overlap between successive chunks; must stay below
    /// `chunk_size`.
    pub chunk_overlap: usize,
    pub edgar_base_url: Url,
    /// EDGAR requires a descriptive user agent (typically an email).
    pub edgar_user_agent: String,
    pub filing_types: Vec<String>,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
    pub metric: DistanceMetric,
    pub schema: ExtractionSchema,
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the two values that
    /// have no sensible default.
    pub fn new(openai_api_key: impl Into<String>, edgar_user_agent: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            edgar_base_url: Url::parse(DEFAULT_EDGAR_BASE_URL).expect("default URL parses"),
            edgar_user_agent: edgar_user_agent.into(),
            filing_types: vec![
                "10-K".to_string(),
                "10-Q".to_string(),
                "8-K".to_string(),
            ],
            top_k: DEFAULT_TOP_K,
            metric: DistanceMetric::default(),
            schema: ExtractionSchema::price_target_moves(),
        }
    }

    /// Loads configuration from `.env` and the process environment.
    ///
    /// `OPENAI_API_KEY` is required; everything else falls back to the
    /// defaults above. Unparsable numeric or URL values are configuration
    /// errors rather than silent fallbacks.
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();

        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            PipelineError::Config("OPENAI_API_KEY not set in environment or .env file".to_string())
        })?;
        let user_agent =
            env::var("EDGAR_USER_AGENT").unwrap_or_else(|_| "your-email@example.com".to_string());

        let mut config = Self::new(api_key, user_agent);
        if let Ok(base) = env::var("OPENAI_API_BASE") {
            config.openai_api_base = base;
        }
        if let Ok(model) = env::var("OPENAI_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(model) = env::var("OPENAI_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Ok(value) = env::var("CHUNK_SIZE") {
            config.chunk_size = parse_usize("CHUNK_SIZE", &value)?;
        }
        if let Ok(value) = env::var("CHUNK_OVERLAP") {
            config.chunk_overlap = parse_usize("CHUNK_OVERLAP", &value)?;
        }
        if let Ok(value) = env::var("RETRIEVE_TOP_K") {
            config.top_k = parse_usize("RETRIEVE_TOP_K", &value)?;
        }
        if let Ok(value) = env::var("EDGAR_BASE_URL") {
            config.edgar_base_url = Url::parse(&value)
                .map_err(|err| PipelineError::Config(format!("EDGAR_BASE_URL: {err}")))?;
        }
        if let Ok(value) = env::var("EDGAR_FILING_TYPES") {
            config.filing_types = value
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_openai_api_base(mut self, base: &str) -> Self {
        self.openai_api_base = base.to_string();
        self
    }

    #[must_use]
    pub fn with_edgar_base_url(mut self, base: Url) -> Self {
        self.edgar_base_url = base;
        self
    }

    #[must_use]
    pub fn with_chunk_window(mut self, size: usize, overlap: usize) -> Self {
        self.chunk_size = size;
        self.chunk_overlap = overlap;
        self
    }

    #[must_use]
    pub fn with_filing_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filing_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: ExtractionSchema) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

fn parse_usize(name: &str, value: &str) -> Result<usize, PipelineError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|err| PipelineError::Config(format!("{name} must be an integer: {err}")))
}
