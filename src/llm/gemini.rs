use async_trait::async_trait;
use log::{ debug, info };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use url::Url;

use super::{ Content, GenerateRequest, GenerativeClient, LlmConfig, LlmError, Part, DEFAULT_BASE_URL, DEFAULT_MODEL };

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a JsonValue>,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: Option<String>,
}

fn build_body(request: &GenerateRequest) -> GeminiRequest<'_> {
    let system_instruction = request.system_instruction
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| GeminiSystemInstruction { parts: vec![Part::text(s.clone())] });
    let generation_config = if
        request.response_mime_type.is_some() ||
        request.response_schema.is_some()
    {
        Some(GenerationConfig {
            response_mime_type: request.response_mime_type.as_deref(),
            response_schema: request.response_schema.as_ref(),
        })
    } else {
        None
    };
    GeminiRequest {
        contents: &request.contents,
        system_instruction,
        generation_config,
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, LlmError> {
    let response: GoogleResponse = serde_json::from_str(body)?;
    let text = response.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    model: String,
    endpoint: Url,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Option<std::time::Duration>
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint = Url::parse(&format!("{}/", base.trim_end_matches('/')))?.join(
            &format!("models/{}:generateContent", model)
        )?;

        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            api_key,
            model,
            endpoint,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or(LlmError::MissingApiKey)?;
        Self::new(api_key, config.model.clone(), config.base_url.clone(), config.timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        info!(
            "GeminiClient::generate() → model={} turns={} json={}",
            self.model,
            request.contents.len(),
            request.response_schema.is_some()
        );
        let body = build_body(request);
        let response = self.http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!("Gemini response: {} bytes", text.len());
        extract_text(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ Attachment, Role };
    use serde_json::json;

    #[test]
    fn endpoint_joins_model_onto_base() {
        let client = GeminiClient::new(
            "key".into(),
            None,
            Some("https://example.test/v1beta/".into()),
            None
        ).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.model(), "gemini-2.5-flash");
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(GeminiClient::new("  ".into(), None, None, None), Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn body_uses_camel_case_and_omits_empty_config() {
        let att = Attachment::from_bytes("image/png", b"x", None);
        let request = GenerateRequest::new(
            vec![Content::new(Role::User, vec![Part::inline(&att), Part::text("what is this?")])]
        ).with_system_instruction("Be brief.");
        let value = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn body_carries_response_schema() {
        let request = GenerateRequest::new(vec![]).with_json_schema(json!({"type": "OBJECT"}));
        let value = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn text_is_joined_from_first_candidate() {
        let body =
            json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "there."}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }).to_string();
        assert_eq!(extract_text(&body).unwrap(), "Hello, there.");
    }

    #[test]
    fn missing_candidates_is_an_empty_response() {
        assert!(matches!(extract_text("{}"), Err(LlmError::EmptyResponse)));
        let blocked = json!({"candidates": [{"finishReason": "SAFETY"}]}).to_string();
        assert!(matches!(extract_text(&blocked), Err(LlmError::EmptyResponse)));
        assert!(matches!(extract_text("not json"), Err(LlmError::Parse(_))));
    }
}
