use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use log::info;
use thiserror::Error;

use crate::models::{ ChatMode, HealthStats };

pub const SYSTEM_INSTRUCTION: &str = "system_instruction";
pub const HEALTH_CONTEXT: &str = "health_context";
pub const REPORT_ANALYSIS: &str = "report_analysis";
pub const RISK_ASSESSMENT: &str = "risk_assessment";
pub const METRIC_EXTRACTION: &str = "metric_extraction";

const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are Medico Assistant, an expert AI healthcare companion.
Your goal is to explain medical concepts, analyze reports, and check symptoms with empathy and accuracy.
ALWAYS start by clarifying you are an AI and not a doctor.
If the user uploads a medical report, extract key findings, explain them in simple terms, and flag any abnormal values.
If the user describes symptoms, perform a preliminary risk assessment and suggest whether they should see a doctor immediately.
Keep responses concise but informative. Use Markdown for formatting.";

const DEFAULT_HEALTH_CONTEXT: &str =
    "[CONTEXT] The user has connected a wearable device ({source}).
Current Live Vitals:
- Heart Rate: {heart_rate} bpm
- Steps Today: {steps}
- Sleep: {sleep_hours} hours
- SpO2: {spo2}%
- Body Temp: {temperature} F
Use this data to provide more personalized advice if relevant to their question.";

const DEFAULT_REPORT_ANALYSIS: &str =
    "Analyze this medical report image.
Extract the following structured data:
1. A risk score from 0-100 (0 being healthy, 100 being critical) based on findings.
2. A brief summary of the report.
3. Key findings (bullet points).
4. Actionable recommendations.
5. Extracted vital signs or lab values with their status (Normal, Warning, Critical).

Return ONLY JSON.";

const DEFAULT_RISK_ASSESSMENT: &str =
    "Based on the conversation below between a user and Medico Assistant, estimate the user's health risk.
Give scores from 0-100 (0 = no risk, 100 = critical) for cardiovascular, metabolic, respiratory and lifestyle risk, an overall score, and a one or two sentence summary.
If the conversation contains little health information, keep the scores low and say so in the summary.

Conversation:
{transcript}

Return ONLY JSON.";

const DEFAULT_METRIC_EXTRACTION: &str =
    "Extract quantitative health metrics (for example cholesterol, glucose, blood pressure, HbA1c, weight) from the input below and any attached document.
Use YYYY-MM-DD dates; when no date is given use {today}.
Return an empty list if no metrics are present.

Input:
{text}

Return ONLY JSON.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt template '{0}' not found")]
    TemplateNotFound(String),
    #[error("Failed to read prompts file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Prompt JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prompt templates with `{placeholder}` slots. A prompts file only needs the
/// entries it overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptConfig {
    pub templates: HashMap<String, String>,
    pub mode_instructions: HashMap<ChatMode, String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        let templates = [
            (SYSTEM_INSTRUCTION, DEFAULT_SYSTEM_INSTRUCTION),
            (HEALTH_CONTEXT, DEFAULT_HEALTH_CONTEXT),
            (REPORT_ANALYSIS, DEFAULT_REPORT_ANALYSIS),
            (RISK_ASSESSMENT, DEFAULT_RISK_ASSESSMENT),
            (METRIC_EXTRACTION, DEFAULT_METRIC_EXTRACTION),
        ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mode_instructions = [
            (
                ChatMode::Medicine,
                "The user is asking about medications. Explain what the medicine is used for, typical dosage ranges, common side effects and notable interactions, and remind them to follow their prescriber's instructions.",
            ),
            (
                ChatMode::Remedy,
                "The user is looking for home remedies. Suggest safe, evidence-informed remedies and lifestyle measures, and say clearly which symptoms mean they should see a doctor instead.",
            ),
        ]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();

        Self { templates, mode_instructions }
    }
}

impl PromptConfig {
    /// Overlays `other` onto `self`; entries in `other` win.
    fn merge(mut self, other: PromptConfig) -> Self {
        self.templates.extend(other.templates);
        self.mode_instructions.extend(other.mode_instructions);
        self
    }
}

pub fn load_prompts_from_str(json: &str) -> Result<PromptConfig, PromptError> {
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Overrides {
        templates: HashMap<String, String>,
        mode_instructions: HashMap<ChatMode, String>,
    }

    let overrides: Overrides = serde_json::from_str(json)?;
    Ok(
        PromptConfig::default().merge(PromptConfig {
            templates: overrides.templates,
            mode_instructions: overrides.mode_instructions,
        })
    )
}

pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    let Some(path) = path else {
        return Ok(Arc::new(PromptConfig::default()));
    };
    let file_content = fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_string(),
        source,
    })?;
    let config = load_prompts_from_str(&file_content)?;
    info!("Loaded prompt overrides from {}", path);
    Ok(Arc::new(config))
}

fn get_template<'a>(config: &'a PromptConfig, key: &str) -> Result<&'a str, PromptError> {
    config.templates
        .get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| PromptError::TemplateNotFound(format!("templates:{}", key)))
}

pub fn get_health_context(config: &PromptConfig, stats: &HealthStats) -> Result<String, PromptError> {
    let template = get_template(config, HEALTH_CONTEXT)?;
    Ok(
        template
            .replace("{source}", &stats.source)
            .replace("{heart_rate}", &stats.heart_rate.to_string())
            .replace("{steps}", &stats.steps.to_string())
            .replace("{sleep_hours}", &format!("{:.1}", stats.sleep_hours))
            .replace("{spo2}", &stats.spo2.to_string())
            .replace("{temperature}", &format!("{:.1}", stats.temperature))
    )
}

/// Base instruction, then the chat mode's focus, then live vitals when a device is connected.
pub fn get_system_instruction(
    config: &PromptConfig,
    mode: ChatMode,
    health: Option<&HealthStats>
) -> Result<String, PromptError> {
    let mut instruction = get_template(config, SYSTEM_INSTRUCTION)?.to_string();
    if let Some(focus) = config.mode_instructions.get(&mode).filter(|s| !s.trim().is_empty()) {
        instruction.push_str("\n\n");
        instruction.push_str(focus);
    }
    if let Some(stats) = health {
        instruction.push_str("\n\n");
        instruction.push_str(&get_health_context(config, stats)?);
    }
    Ok(instruction)
}

pub fn get_report_prompt(config: &PromptConfig) -> Result<String, PromptError> {
    Ok(get_template(config, REPORT_ANALYSIS)?.to_string())
}

pub fn get_risk_prompt(config: &PromptConfig, transcript: &str) -> Result<String, PromptError> {
    let template = get_template(config, RISK_ASSESSMENT)?;
    Ok(template.replace("{transcript}", transcript))
}

pub fn get_metric_prompt(config: &PromptConfig, text: &str, today: &str) -> Result<String, PromptError> {
    let template = get_template(config, METRIC_EXTRACTION)?;
    Ok(template.replace("{today}", today).replace("{text}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> HealthStats {
        HealthStats {
            heart_rate: 74,
            steps: 8123,
            sleep_hours: 7.25,
            blood_pressure: "120/80".into(),
            spo2: 98,
            temperature: 98.66,
            last_synced: 0,
            source: "Fitbit".into(),
            history: Vec::new(),
        }
    }

    #[test]
    fn system_instruction_layers_mode_and_vitals() {
        let config = PromptConfig::default();
        let plain = get_system_instruction(&config, ChatMode::Chat, None).unwrap();
        assert!(plain.starts_with("You are Medico Assistant"));
        assert!(!plain.contains("[CONTEXT]"));

        let full = get_system_instruction(&config, ChatMode::Medicine, Some(&stats())).unwrap();
        assert!(full.contains("medications"));
        assert!(full.contains("wearable device (Fitbit)"));
        assert!(full.contains("Heart Rate: 74 bpm"));
        assert!(full.contains("Sleep: 7.2 hours") || full.contains("Sleep: 7.3 hours"));
        assert!(full.contains("Body Temp: 98.7 F"));
    }

    #[test]
    fn overrides_keep_unlisted_defaults() {
        let config = load_prompts_from_str(
            r#"{"templates": {"risk_assessment": "Score this: {transcript}"}, "mode_instructions": {"remedy": "Herbal only."}}"#
        ).unwrap();
        assert_eq!(get_risk_prompt(&config, "User: hi").unwrap(), "Score this: User: hi");
        assert!(get_report_prompt(&config).unwrap().contains("medical report"));
        assert_eq!(config.mode_instructions[&ChatMode::Remedy], "Herbal only.");
        assert!(config.mode_instructions.contains_key(&ChatMode::Medicine));
    }

    #[test]
    fn missing_template_is_reported() {
        let config = PromptConfig { templates: HashMap::new(), mode_instructions: HashMap::new() };
        let err = get_report_prompt(&config).unwrap_err();
        assert_eq!(err.to_string(), "Prompt template 'templates:report_analysis' not found");
    }

    #[test]
    fn metric_prompt_fills_date_and_text() {
        let prompt = get_metric_prompt(&PromptConfig::default(), "LDL 160", "2024-05-01").unwrap();
        assert!(prompt.contains("use 2024-05-01"));
        assert!(prompt.contains("LDL 160"));
    }

    #[test]
    fn no_file_means_defaults() {
        let config = load_prompts(None).unwrap();
        assert_eq!(*config, PromptConfig::default());
    }

    #[test]
    fn prompt_file_errors_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = load_prompts(missing.to_str()).unwrap_err();
        assert!(matches!(err, PromptError::Io { .. }));
        assert!(err.to_string().starts_with("Failed to read prompts file"));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(load_prompts(broken.to_str()), Err(PromptError::Json(_))));

        let custom = dir.path().join("custom.json");
        std::fs::write(&custom, r#"{"templates": {"report_analysis": "Read it."}}"#).unwrap();
        assert_eq!(get_report_prompt(&load_prompts(custom.to_str()).unwrap()).unwrap(), "Read it.");
    }
}
