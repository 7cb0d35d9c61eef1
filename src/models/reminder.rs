use chrono::Weekday;
use serde::{ Deserialize, Deserializer, Serialize };
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderCategory {
    #[default]
    Medication,
    Appointment,
    Exercise,
    Hydration,
    Other,
}

impl<'de> Deserialize<'de> for ReminderCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(ReminderCategory::Other))
    }
}

impl fmt::Display for ReminderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReminderCategory::Medication => "medication",
            ReminderCategory::Appointment => "appointment",
            ReminderCategory::Exercise => "exercise",
            ReminderCategory::Hydration => "hydration",
            ReminderCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ReminderCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "medication" | "medicine" => Ok(ReminderCategory::Medication),
            "appointment" => Ok(ReminderCategory::Appointment),
            "exercise" => Ok(ReminderCategory::Exercise),
            "hydration" | "water" => Ok(ReminderCategory::Hydration),
            "other" => Ok(ReminderCategory::Other),
            _ => Err(format!("Unsupported reminder category: {}", s)),
        }
    }
}

pub fn every_day() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    /// Local time of day, `HH:mm`.
    pub time: String,
    #[serde(default)]
    pub category: ReminderCategory,
    #[serde(default = "every_day")]
    pub days: Vec<Weekday>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Reminder {
    pub fn days_label(&self) -> String {
        if self.days.len() == 7 {
            return "Every day".to_string();
        }
        self.days
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
