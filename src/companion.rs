use chrono::{ Local, Utc };
use log::{ error, info, warn };
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::prompt::{ self, PromptConfig };
use crate::error::Result;
use crate::llm::{ schema, strip_code_fence, Content, GenerateRequest, GenerativeClient, LlmError, Part };
use crate::models::{
    Attachment,
    ChatMode,
    HealthMetric,
    HealthRiskAnalysis,
    HealthRiskProfile,
    HealthStats,
    Message,
    Role,
};

pub const CHAT_FALLBACK: &str =
    "I encountered an error while processing your request. Please try again.";
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't process that.";
pub const IMAGE_ONLY_PROMPT: &str = "Analyze this image";

const METRIC_KEYWORDS: [&str; 2] = ["cholesterol", "glucose"];

#[derive(Deserialize)]
#[serde(untagged)]
enum MetricsPayload {
    Wrapped {
        metrics: Vec<HealthMetric>,
    },
    Bare(Vec<HealthMetric>),
}

/// Maps stored messages to request turns. System notes stay local and
/// earlier attachments are not re-sent; an image-only turn is replayed as
/// the prompt that went out with it.
pub fn history_to_contents(history: &[Message]) -> Vec<Content> {
    history
        .iter()
        .filter(|m| m.role != Role::System)
        .filter_map(|m| {
            let text = if !m.text.trim().is_empty() {
                m.text.as_str()
            } else if m.role == Role::User && !m.attachments.is_empty() {
                IMAGE_ONLY_PROMPT
            } else {
                return None;
            };
            Some(Content::new(m.role, vec![Part::text(text)]))
        })
        .collect()
}

pub fn format_transcript(messages: &[&Message]) -> String {
    let mut result = String::new();
    for msg in messages {
        let speaker = match msg.role {
            Role::User => "User",
            Role::Model => "Medico",
            Role::System => {
                continue;
            }
        };
        result.push_str(&format!("{}: {}\n", speaker, msg.text));
    }
    result
}

/// Metric extraction only runs for messages likely to carry lab values.
pub fn should_extract_metrics(message: &Message) -> bool {
    if !message.attachments.is_empty() {
        return true;
    }
    let text = message.text.to_lowercase();
    METRIC_KEYWORDS.iter().any(|k| text.contains(k))
}

fn parse_structured<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, LlmError> {
    Ok(serde_json::from_str(strip_code_fence(raw))?)
}

/// Front door to the hosted model: one method per task, each building its
/// own prompt and, for structured tasks, its response schema.
#[derive(Clone)]
pub struct Companion {
    client: Arc<dyn GenerativeClient>,
    prompts: Arc<PromptConfig>,
}

impl Companion {
    pub fn new(client: Arc<dyn GenerativeClient>, prompts: Arc<PromptConfig>) -> Self {
        Self { client, prompts }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Never fails: errors are logged and replaced with a canned reply.
    pub async fn send_message(
        &self,
        history: &[Message],
        text: &str,
        attachments: &[Attachment],
        health: Option<&HealthStats>,
        mode: ChatMode
    ) -> String {
        match self.try_send_message(history, text, attachments, health, mode).await {
            Ok(reply) if reply.trim().is_empty() => EMPTY_REPLY.to_string(),
            Ok(reply) => reply,
            Err(e) => {
                error!("Chat request failed: {}", e);
                CHAT_FALLBACK.to_string()
            }
        }
    }

    async fn try_send_message(
        &self,
        history: &[Message],
        text: &str,
        attachments: &[Attachment],
        health: Option<&HealthStats>,
        mode: ChatMode
    ) -> Result<String> {
        let instruction = prompt::get_system_instruction(&self.prompts, mode, health)?;
        let text = if text.trim().is_empty() && !attachments.is_empty() {
            IMAGE_ONLY_PROMPT
        } else {
            text
        };

        let mut parts: Vec<Part> = attachments.iter().map(Part::inline).collect();
        parts.push(Part::text(text));

        let mut contents = history_to_contents(history);
        contents.push(Content::new(Role::User, parts));

        let request = GenerateRequest::new(contents).with_system_instruction(instruction);
        match self.client.generate(&request).await {
            Ok(reply) => Ok(reply),
            Err(LlmError::EmptyResponse) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn analyze_medical_report(&self, report: &Attachment) -> Result<HealthRiskAnalysis> {
        info!("Analyzing report ({}, {} base64 bytes)", report.mime_type, report.data.len());
        let request = GenerateRequest::new(
            vec![
                Content::new(
                    Role::User,
                    vec![Part::inline(report), Part::text(prompt::get_report_prompt(&self.prompts)?)]
                )
            ]
        ).with_json_schema(schema::report_analysis());

        let raw = self.client.generate(&request).await?;
        let analysis = parse_structured(&raw).map_err(|e| {
            error!("Report analysis returned unreadable JSON: {}", e);
            e
        })?;
        Ok(analysis)
    }

    /// Scores the conversation; an empty conversation yields the default
    /// profile without a request.
    pub async fn assess_risk(&self, messages: &[&Message]) -> Result<HealthRiskProfile> {
        let transcript = format_transcript(messages);
        if transcript.trim().is_empty() {
            info!("No conversation to assess, returning default risk profile");
            return Ok(HealthRiskProfile::default());
        }
        let request = GenerateRequest::new(
            vec![
                Content::new(
                    Role::User,
                    vec![Part::text(prompt::get_risk_prompt(&self.prompts, &transcript)?)]
                )
            ]
        ).with_json_schema(schema::risk_profile());

        let raw = self.client.generate(&request).await?;
        let mut profile: HealthRiskProfile = parse_structured(&raw)?;
        profile.last_updated = Some(Utc::now().timestamp_millis());
        Ok(profile)
    }

    /// Best effort: any failure yields an empty list.
    pub async fn extract_health_metrics(
        &self,
        text: &str,
        attachment: Option<&Attachment>
    ) -> Vec<HealthMetric> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let prompt_text = match prompt::get_metric_prompt(&self.prompts, text, &today) {
            Ok(p) => p,
            Err(e) => {
                warn!("Metric extraction skipped: {}", e);
                return Vec::new();
            }
        };

        let mut parts = Vec::new();
        if let Some(att) = attachment {
            parts.push(Part::inline(att));
        }
        parts.push(Part::text(prompt_text));
        let request = GenerateRequest::new(vec![Content::new(Role::User, parts)]).with_json_schema(
            schema::health_metrics()
        );

        let raw = match self.client.generate(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Metric extraction failed: {}", e);
                return Vec::new();
            }
        };
        match parse_structured::<MetricsPayload>(&raw) {
            Ok(MetricsPayload::Wrapped { metrics }) | Ok(MetricsPayload::Bare(metrics)) => {
                info!("Extracted {} health metric(s)", metrics.len());
                metrics
            }
            Err(e) => {
                warn!("Metric extraction returned unreadable JSON: {}", e);
                Vec::new()
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedClient;
    use super::*;
    use crate::models::VitalStatus;

    fn companion(replies: Vec<std::result::Result<String, LlmError>>) -> (Companion, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::new(replies));
        (Companion::new(client.clone(), Arc::new(PromptConfig::default())), client)
    }

    #[tokio::test]
    async fn chat_sends_history_then_attachment_then_text() {
        let (companion, client) = companion(vec![Ok("It looks like a rash.".into())]);
        let history = vec![
            Message::model("Hello!"),
            Message::system("local note"),
            Message::user("I have a rash", Vec::new())
        ];
        let image = Attachment::from_bytes("image/jpeg", b"jpg", None);

        let reply = companion.send_message(&history, "", &[image], None, ChatMode::Chat).await;
        assert_eq!(reply, "It looks like a rash.");

        let req = client.request(0);
        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.contents[0].role, "model");
        assert_eq!(req.contents[1].role, "user");
        let last = &req.contents[2];
        assert!(last.parts[0].inline_data.is_some());
        assert_eq!(last.parts[1].text.as_deref(), Some(IMAGE_ONLY_PROMPT));
        assert!(req.response_schema.is_none());
        assert!(req.system_instruction.unwrap().contains("Medico Assistant"));
    }

    #[tokio::test]
    async fn chat_failures_become_fallback_text() {
        let (companion, _) = companion(
            vec![Err(LlmError::Api { status: 500, body: "boom".into() }), Err(LlmError::EmptyResponse)]
        );
        let reply = companion.send_message(&[], "hi", &[], None, ChatMode::Chat).await;
        assert_eq!(reply, CHAT_FALLBACK);
        let reply = companion.send_message(&[], "hi", &[], None, ChatMode::Chat).await;
        assert_eq!(reply, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn report_analysis_parses_fenced_json() {
        let raw =
            "```json\n{\"riskScore\": 62, \"summary\": \"High LDL\", \"keyFindings\": [\"LDL 190\"], \"recommendations\": [\"See a GP\"], \"vitalSigns\": [{\"name\": \"LDL\", \"value\": \"190 mg/dL\", \"status\": \"Critical\"}]}\n```";
        let (companion, client) = companion(vec![Ok(raw.into())]);
        let report = Attachment::from_bytes("image/jpeg", b"scan", None);

        let analysis = companion.analyze_medical_report(&report).await.unwrap();
        assert_eq!(analysis.risk_score, 62);
        assert_eq!(analysis.vital_signs[0].status, VitalStatus::Critical);

        let req = client.request(0);
        assert_eq!(req.response_mime_type.as_deref(), Some("application/json"));
        assert!(req.contents[0].parts[0].inline_data.is_some());
    }

    #[tokio::test]
    async fn report_analysis_propagates_errors() {
        let (companion, _) = companion(vec![Ok("not json".into())]);
        let report = Attachment::from_bytes("image/jpeg", b"scan", None);
        assert!(companion.analyze_medical_report(&report).await.is_err());
    }

    #[tokio::test]
    async fn risk_assessment_skips_empty_conversations() {
        let (companion, client) = companion(vec![]);
        let greeting = Message::system("note");
        let profile = companion.assess_risk(&[&greeting]).await.unwrap();
        assert_eq!(profile, HealthRiskProfile::default());
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn risk_assessment_stamps_profile() {
        let raw =
            r#"{"overallScore": 55, "cardiovascular": 60, "metabolic": 40, "respiratory": 10, "lifestyle": 30, "summary": "Watch blood pressure."}"#;
        let (companion, client) = companion(vec![Ok(raw.into())]);
        let user = Message::user("My blood pressure is 150/95", Vec::new());
        let reply = Message::model("That is elevated.");

        let profile = companion.assess_risk(&[&user, &reply]).await.unwrap();
        assert_eq!(profile.overall_score, 55);
        assert!(profile.last_updated.is_some());

        let prompt = client.request(0).contents[0].parts[0].text.clone().unwrap();
        assert!(prompt.contains("User: My blood pressure is 150/95"));
        assert!(prompt.contains("Medico: That is elevated."));
    }

    #[tokio::test]
    async fn metric_extraction_accepts_wrapped_or_bare_lists() {
        let wrapped =
            r#"{"metrics": [{"date": "2024-05-01", "value": 210, "unit": "mg/dL", "type": "Total Cholesterol"}]}"#;
        let bare = r#"[{"date": "2024-05-02", "value": 101, "unit": "mg/dL", "type": "Glucose"}]"#;
        let (companion, _) = companion(
            vec![Ok(wrapped.into()), Ok(bare.into()), Ok("garbage".into()), Err(LlmError::EmptyResponse)]
        );

        let first = companion.extract_health_metrics("cholesterol 210", None).await;
        assert_eq!(first[0].value, 210.0);
        let second = companion.extract_health_metrics("glucose 101", None).await;
        assert_eq!(second[0].metric_type, "Glucose");
        assert!(companion.extract_health_metrics("x", None).await.is_empty());
        assert!(companion.extract_health_metrics("x", None).await.is_empty());
    }

    #[test]
    fn extraction_trigger_matches_keywords_or_attachments() {
        assert!(should_extract_metrics(&Message::user("My GLUCOSE was 120", Vec::new())));
        assert!(!should_extract_metrics(&Message::user("I have a headache", Vec::new())));
        let att = Attachment::from_bytes("image/png", b"x", None);
        assert!(should_extract_metrics(&Message::user("", vec![att])));
    }
}
