pub mod gemini;
pub mod schema;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use self::gemini::GeminiClient;
use crate::models::{ Attachment, Role };

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key for the generative model")]
    MissingApiKey,
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model API returned {status}: {body}")]
    Api {
        status: u16,
        body: String,
    },
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error("Failed to parse model output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Model client unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One piece of a turn: either text or an inline file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn inline(attachment: &Attachment) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: attachment.mime_type.clone(),
                data: attachment.data.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role: role.as_str().to_string(), parts }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub response_mime_type: Option<String>,
    pub response_schema: Option<JsonValue>,
}

impl GenerateRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self { contents, ..Self::default() }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Switches the model to JSON output constrained by `schema`.
    pub fn with_json_schema(mut self, schema: JsonValue) -> Self {
        self.response_mime_type = Some("application/json".to_string());
        self.response_schema = Some(schema);
        self
    }
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError>;

    fn model(&self) -> &str;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn GenerativeClient>, LlmError> {
    let client = GeminiClient::from_config(config)?;
    Ok(Arc::new(client))
}

/// Stands in for a client that could not be built. Every request fails with
/// the build error, so callers take their usual fallback paths.
pub struct UnavailableClient {
    model: String,
    reason: String,
}

impl UnavailableClient {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { model: model.into(), reason: reason.into() }
    }
}

#[async_trait]
impl GenerativeClient for UnavailableClient {
    async fn generate(&self, _request: &GenerateRequest) -> Result<String, LlmError> {
        Err(LlmError::Unavailable(self.reason.clone()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Removes a surrounding Markdown code fence, which models sometimes add
/// around JSON even in JSON mode.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fences_are_removed() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn parts_serialize_in_wire_shape() {
        let att = Attachment::from_bytes("image/jpeg", b"img", None);
        let json = serde_json::to_value(Part::inline(&att)).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "image/jpeg");
        assert!(json.get("text").is_none());

        let json = serde_json::to_value(Part::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"text": "hi"}));
    }

    #[test]
    fn json_schema_sets_mime_type() {
        let req = GenerateRequest::new(Vec::new()).with_json_schema(serde_json::json!({"type": "OBJECT"}));
        assert_eq!(req.response_mime_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn client_requires_api_key() {
        let err = new_client(&LlmConfig::default()).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn unavailable_client_reports_its_reason() {
        let client = UnavailableClient::new(DEFAULT_MODEL, "Missing API key for the generative model");
        let err = client.generate(&GenerateRequest::new(Vec::new())).await.unwrap_err();
        assert_eq!(err.to_string(), "Model client unavailable: Missing API key for the generative model");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }
}
