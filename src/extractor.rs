//! Schema-driven structured extraction from retrieved chunks.
//!
//! An [`ExtractionSchema`] describes the fields of the target table; the
//! extractor turns it into a function tool for a chat-completion endpoint,
//! forces the model to call that tool over the retrieved chunk records, and
//! returns the tool arguments' `records` array.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::PipelineConfig;
use crate::embedder::build_authorized_client;
use crate::stores::ScoredChunk;
use crate::types::PipelineError;

/// How a field's column is typed once tabulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Parsed into a date column.
    Date,
    /// Coerced to text.
    Text,
    /// Text restricted to a closed set of values; validation of the set is
    /// left to consumers.
    Enum,
}

/// One named field of the extraction target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub description: String,
    pub kind: FieldKind,
    /// Allowed values for [`FieldKind::Enum`] fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    pub required: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            allowed_values: None,
            required: false,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Ordered set of fields to extract; field order becomes column order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractionSchema {
    fields: Vec<Field>,
}

impl ExtractionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The sample schema: date, ticker, and price-target direction.
    pub fn price_target_moves() -> Self {
        Self::new()
            .with_field(
                Field::new(
                    "Date",
                    FieldKind::Date,
                    "The date when the update was made",
                )
                .required(),
            )
            .with_field(
                Field::new(
                    "Ticker",
                    FieldKind::Text,
                    "The ticker of the stock being updated on Date",
                )
                .required(),
            )
            .with_field(
                Field::new(
                    "Direction",
                    FieldKind::Enum,
                    "Price target 'raised' or 'lowered' on Date",
                )
                .with_allowed_values(["raised", "lowered"])
                .required(),
            )
    }

    /// JSON-Schema parameters for the extraction tool: a `records` array of
    /// objects with one property per field.
    pub fn tool_parameters(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!("string"));
            prop.insert("description".to_string(), json!(field.description));
            if let Some(values) = &field.allowed_values {
                prop.insert("enum".to_string(), json!(values));
            }
            properties.insert(field.name.clone(), Value::Object(prop));
            if field.required {
                required.push(field.name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": {
                "records": {
                    "type": "array",
                    "description": "One object per extracted row",
                    "items": {
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }
                }
            },
            "required": ["records"]
        })
    }
}

/// Extracts schema-shaped records from retrieved chunks.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(
        &self,
        schema: &ExtractionSchema,
        chunks: &[ScoredChunk],
    ) -> Result<Vec<Map<String, Value>>, PipelineError>;
}

const TOOL_NAME: &str = "record_rows";

/// Chat-completion extractor using forced function calling.
#[derive(Clone)]
pub struct OpenAiExtractor {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiExtractor {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = build_authorized_client(&config.openai_api_key)?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.openai_api_base.trim_end_matches('/')
            ),
            model: config.chat_model.clone(),
        })
    }

    fn build_request(&self, schema: &ExtractionSchema, chunks: &[ScoredChunk]) -> Value {
        let mut messages = vec![
            json!({
                "role": "system",
                "content": "You are an assistant that extracts structured data from SEC filings."
            }),
            json!({
                "role": "assistant",
                "content": format!(
                    "Schema for extraction: {}",
                    serde_json::to_string(schema).unwrap_or_default()
                )
            }),
            json!({
                "role": "user",
                "content": "Extract the schema fields from the provided SEC filing chunks."
            }),
        ];
        for chunk in chunks {
            messages.push(json!({
                "role": "assistant",
                "content": serde_json::to_string(&chunk.record).unwrap_or_default()
            }));
        }

        json!({
            "model": self.model,
            "messages": messages,
            "tools": [{
                "type": "function",
                "function": {
                    "name": TOOL_NAME,
                    "description": "Record the rows extracted from the filing chunks.",
                    "parameters": schema.tool_parameters(),
                }
            }],
            "tool_choice": {"type": "function", "function": {"name": TOOL_NAME}}
        })
    }
}

#[async_trait]
impl FieldExtractor for OpenAiExtractor {
    async fn extract(
        &self,
        schema: &ExtractionSchema,
        chunks: &[ScoredChunk],
    ) -> Result<Vec<Map<String, Value>>, PipelineError> {
        let request = self.build_request(schema, chunks);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let parsed: ChatResponse = response.json().await?;

        let arguments = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.tool_calls)
            .and_then(|calls| calls.into_iter().next())
            .map(|call| call.function.arguments)
            .ok_or_else(|| {
                PipelineError::MalformedResponse(
                    "chat completion contained no tool call".to_string(),
                )
            })?;

        let extracted: ExtractedRecords = serde_json::from_str(&arguments).map_err(|err| {
            PipelineError::MalformedResponse(format!("unparsable tool arguments: {err}"))
        })?;
        Ok(extracted.records)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: ToolFunction,
}

#[derive(Deserialize)]
struct ToolFunction {
    arguments: String,
}

#[derive(Deserialize)]
struct ExtractedRecords {
    records: Vec<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::ChunkRecord;
    use httpmock::prelude::*;

    fn chunk(content: &str) -> ScoredChunk {
        ScoredChunk {
            record: ChunkRecord {
                id: "c1".to_string(),
                cik: "789019".to_string(),
                filing_type: "10-K".to_string(),
                accession: "0000789019-25-000049".to_string(),
                filing_date: "2025-01-30".to_string(),
                source_url: "https://example.com/doc.htm".to_string(),
                chunk_index: 0,
                content: content.to_string(),
            },
            score: 0.1,
        }
    }

    #[test]
    fn tool_parameters_mirror_the_schema() {
        let params = ExtractionSchema::price_target_moves().tool_parameters();
        let items = &params["properties"]["records"]["items"];

        assert_eq!(items["properties"]["Date"]["type"], "string");
        assert_eq!(
            items["properties"]["Direction"]["enum"],
            json!(["raised", "lowered"])
        );
        assert_eq!(items["required"], json!(["Date", "Ticker", "Direction"]));
    }

    #[test]
    fn request_carries_one_message_per_chunk_and_forces_the_tool() {
        let config = PipelineConfig::new("sk-test", "agent");
        let extractor = OpenAiExtractor::new(&config).unwrap();
        let schema = ExtractionSchema::price_target_moves();
        let request =
            extractor.build_request(&schema, &[chunk("chunk one"), chunk("chunk two")]);

        assert_eq!(request["messages"].as_array().unwrap().len(), 3 + 2);
        assert_eq!(request["tool_choice"]["function"]["name"], TOOL_NAME);
    }

    #[tokio::test]
    async fn extract_parses_tool_call_arguments() {
        let server = MockServer::start_async().await;
        let arguments = serde_json::to_string(&json!({
            "records": [
                {"Date": "2025-01-30", "Ticker": "MSFT", "Direction": "raised"}
            ]
        }))
        .unwrap();
        server
            .mock_async(move |when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {
                            "tool_calls": [{
                                "function": {"name": TOOL_NAME, "arguments": arguments}
                            }]
                        }
                    }]
                }));
            })
            .await;

        let config =
            PipelineConfig::new("sk-test", "agent").with_openai_api_base(&server.base_url());
        let extractor = OpenAiExtractor::new(&config).unwrap();
        let records = extractor
            .extract(&ExtractionSchema::price_target_moves(), &[chunk("text")])
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Ticker"], "MSFT");
    }

    #[tokio::test]
    async fn missing_tool_call_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .json_body(json!({"choices": [{"message": {"content": "no tools"}}]}));
            })
            .await;

        let config =
            PipelineConfig::new("sk-test", "agent").with_openai_api_base(&server.base_url());
        let extractor = OpenAiExtractor::new(&config).unwrap();
        let err = extractor
            .extract(&ExtractionSchema::price_target_moves(), &[chunk("text")])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }
}
