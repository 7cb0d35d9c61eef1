use base64::{ engine::general_purpose::STANDARD, Engine as _ };
use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value as JsonValue;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::System => "system",
        }
    }
}

/// Inline file sent alongside a user message. `data` is plain base64 without
/// the `data:<mime>;base64,` prefix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attachment {
    pub fn from_bytes(mime_type: &str, bytes: &[u8], name: Option<String>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: STANDARD.encode(bytes),
            name,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Ok(Self::from_bytes(guess_mime_type(path), &bytes, name))
    }

    /// Splits a `data:<mime>;base64,<payload>` URL as produced by a browser file reader.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        if payload.is_empty() {
            return None;
        }
        Some(Self {
            mime_type: if mime_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                mime_type.to_string()
            },
            data: payload.to_string(),
            name: None,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            attachments,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(Role::User, text, attachments)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text, Vec::new())
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text, Vec::new())
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

// Older documents stored the timestamp as an ISO-8601 string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where D: Deserializer<'de>
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Number(n) =>
            n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| serde::de::Error::custom("timestamp out of range")),
        JsonValue::String(s) =>
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.timestamp_millis())
                .map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid timestamp: {}", other))),
    }
}

/// Independent conversation lists kept per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[serde(alias = "CHAT", alias = "general")]
    Chat,
    #[serde(alias = "MEDICINE")]
    Medicine,
    #[serde(alias = "REMEDY")]
    Remedy,
}

impl ChatMode {
    pub const ALL: [ChatMode; 3] = [ChatMode::Chat, ChatMode::Medicine, ChatMode::Remedy];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Chat => "chat",
            ChatMode::Medicine => "medicine",
            ChatMode::Remedy => "remedy",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChatMode::Chat => "Consultation",
            ChatMode::Medicine => "Medicine Guide",
            ChatMode::Remedy => "Home Remedies",
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            ChatMode::Chat =>
                "Hello! I'm Medico Assistant. I can help explain medical reports, check symptoms, or track your health history. How can I help you today?",
            ChatMode::Medicine =>
                "Hi! Ask me about any medication: what it is used for, common dosages, side effects or interactions.",
            ChatMode::Remedy =>
                "Hello! Tell me what's bothering you and I'll suggest safe home remedies, and let you know when it's time to see a doctor.",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseChatModeError {
    message: String,
}

impl fmt::Display for ParseChatModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseChatModeError {}

impl FromStr for ChatMode {
    type Err = ParseChatModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" | "general" | "consultation" => Ok(ChatMode::Chat),
            "medicine" | "medication" => Ok(ChatMode::Medicine),
            "remedy" | "remedies" => Ok(ChatMode::Remedy),
            _ =>
                Err(ParseChatModeError {
                    message: format!("Invalid chat mode: '{}'", s),
                }),
        }
    }
}
