use log::warn;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::chat::{ ChatMode, Message, Role };
use super::health::{ HealthRiskAnalysis, HealthRiskProfile };
use super::reminder::Reminder;

/// Everything persisted for one signed-in email, stored as a single document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub chats: BTreeMap<ChatMode, Vec<Message>>,
    pub risk_profile: Option<HealthRiskProfile>,
    pub reminders: Vec<Reminder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_report: Option<HealthRiskAnalysis>,
}

impl Default for UserData {
    fn default() -> Self {
        Self {
            chats: ChatMode::ALL.iter().map(|m| (*m, Vec::new())).collect(),
            risk_profile: None,
            reminders: Vec::new(),
            last_report: None,
        }
    }
}

impl UserData {
    /// Builds a document field by field so that one damaged section does not
    /// discard the rest.
    pub fn from_value(value: JsonValue) -> Self {
        let mut data = Self::default();
        let JsonValue::Object(mut map) = value else {
            warn!("User document is not a JSON object, using defaults");
            return data;
        };

        if let Some(JsonValue::Object(chats)) = map.remove("chats") {
            for mode in ChatMode::ALL {
                let list = chats
                    .iter()
                    .find(|(k, _)| k.parse::<ChatMode>().ok() == Some(mode))
                    .map(|(_, v)| v.clone());
                if let Some(list) = list {
                    data.chats.insert(mode, parse_messages(mode, list));
                }
            }
        }

        if let Some(profile) = map.remove("riskProfile").filter(|v| !v.is_null()) {
            match serde_json::from_value(profile) {
                Ok(p) => {
                    data.risk_profile = Some(p);
                }
                Err(e) => warn!("Dropping unreadable risk profile: {}", e),
            }
        }

        if let Some(JsonValue::Array(items)) = map.remove("reminders") {
            data.reminders = items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<Reminder>(item) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        warn!("Skipping unreadable reminder: {}", e);
                        None
                    }
                })
                .collect();
        }

        if let Some(report) = map.remove("lastReport").filter(|v| !v.is_null()) {
            data.last_report = serde_json::from_value(report).ok();
        }

        data
    }

    pub fn chat(&self, mode: ChatMode) -> &[Message] {
        self.chats.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }

    /// User messages that carried files, with their chat mode, oldest first.
    pub fn documents(&self) -> Vec<(ChatMode, &Message)> {
        let mut docs: Vec<(ChatMode, &Message)> = self.chats
            .iter()
            .flat_map(|(mode, messages)| messages.iter().map(move |m| (*mode, m)))
            .filter(|(_, m)| m.role == Role::User && !m.attachments.is_empty())
            .collect();
        docs.sort_by_key(|(_, m)| m.timestamp);
        docs
    }

    /// All messages across modes, oldest first.
    pub fn all_messages(&self) -> Vec<&Message> {
        let mut all: Vec<&Message> = self.chats.values().flatten().collect();
        all.sort_by_key(|m| m.timestamp);
        all
    }
}

fn parse_messages(mode: ChatMode, value: JsonValue) -> Vec<Message> {
    let JsonValue::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Message>(item) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Skipping unreadable {} message: {}", mode, e);
                None
            }
        })
        .collect()
}
