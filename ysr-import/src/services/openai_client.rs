//! OpenAI chat-completions extractor
//!
//! Sends the parsed rows with a fixed per-kind prompt in a single
//! non-streaming request and parses the returned JSON array. Failures are
//! reported once; nothing is retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use ysr_common::models::{ParticipantDraft, ProgramDraft};

use crate::config::OpenAiConfig;
use crate::models::Row;
use crate::services::prompts;
use crate::types::{EntityKind, ExtractedBatch, ExtractionError, RecordExtractor};

const USER_AGENT: &str = concat!("ysr-import/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extractor backed by the OpenAI chat-completions API
pub struct OpenAiExtractor {
    http_client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiExtractor {
    pub fn new(config: OpenAiConfig) -> Result<Self, ExtractionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RecordExtractor for OpenAiExtractor {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract(
        &self,
        rows: &[Row],
        kind: EntityKind,
    ) -> Result<ExtractedBatch, ExtractionError> {
        let prompt = prompts::build_extraction_prompt(kind, rows);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompts::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            kind = %kind,
            rows = rows.len(),
            model = %self.config.model,
            "Requesting extraction from language model"
        );

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExtractionError::EmptyResponse)?;

        let batch = parse_extraction_response(kind, &content)?;
        tracing::info!(kind = %kind, records = batch.len(), "Language model extraction complete");
        Ok(batch)
    }
}

/// Parse model output into a batch of `kind`
///
/// Accepts a bare JSON array, or an object holding exactly one array field,
/// optionally wrapped in a Markdown code fence.
pub fn parse_extraction_response(
    kind: EntityKind,
    content: &str,
) -> Result<ExtractedBatch, ExtractionError> {
    let json = strip_code_fence(content);
    let value: Value =
        serde_json::from_str(json).map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;

    let records = match value {
        Value::Array(records) => records,
        Value::Object(map) => {
            let mut arrays = map.into_iter().filter(|(_, v)| v.is_array());
            match (arrays.next(), arrays.next()) {
                (Some((_, Value::Array(records))), None) => records,
                _ => {
                    return Err(ExtractionError::UnexpectedShape(
                        "expected an array or an object with one array field".to_string(),
                    ))
                }
            }
        }
        other => {
            return Err(ExtractionError::UnexpectedShape(format!(
                "expected an array, got {}",
                json_type_name(&other)
            )))
        }
    };

    let records = Value::Array(records);
    let batch = match kind {
        EntityKind::Participant => ExtractedBatch::Participants(
            serde_json::from_value::<Vec<ParticipantDraft>>(records)
                .map_err(|e| ExtractionError::UnexpectedShape(e.to_string()))?,
        ),
        EntityKind::Program => ExtractedBatch::Programs(
            serde_json::from_value::<Vec<ProgramDraft>>(records)
                .map_err(|e| ExtractionError::UnexpectedShape(e.to_string()))?,
        ),
    };
    Ok(batch)
}

/// Remove a surrounding ```json ... ``` (or bare ```) fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") up to the end of the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_array() {
        let batch = parse_extraction_response(
            EntityKind::Program,
            r#"[{"name":"Robotics","description":"Build robots after school","participants":["Ana"]}]"#,
        )
        .unwrap();
        match batch {
            ExtractedBatch::Programs(programs) => {
                assert_eq!(programs.len(), 1);
                assert_eq!(programs[0].participants, vec!["Ana"]);
            }
            other => panic!("unexpected batch: {:?}", other),
        }
    }

    #[test]
    fn test_fenced_response() {
        let content = "```json\n[{\"name\":\"Ana Ruiz\",\"identificationNumber\":\"A-100\"}]\n```";
        let batch = parse_extraction_response(EntityKind::Participant, content).unwrap();
        match batch {
            ExtractedBatch::Participants(participants) => {
                assert_eq!(participants[0].identification_number, "A-100");
                assert_eq!(participants[0].date_of_birth, "");
                assert!(participants[0].programs.is_empty());
            }
            other => panic!("unexpected batch: {:?}", other),
        }
    }

    #[test]
    fn test_wrapped_in_object() {
        let content = r#"{"participants": [{"name": "Ana"}, {"name": "Bo"}]}"#;
        let batch = parse_extraction_response(EntityKind::Participant, content).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_object_with_two_arrays_rejected() {
        let content = r#"{"a": [], "b": []}"#;
        assert!(matches!(
            parse_extraction_response(EntityKind::Program, content),
            Err(ExtractionError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_prose_is_invalid_json() {
        assert!(matches!(
            parse_extraction_response(EntityKind::Program, "Here are your programs!"),
            Err(ExtractionError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_scalar_is_unexpected_shape() {
        assert!(matches!(
            parse_extraction_response(EntityKind::Program, "42"),
            Err(ExtractionError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```json\n[1]\n```\n"), "[1]");
    }
}
