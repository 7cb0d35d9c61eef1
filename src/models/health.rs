use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value as JsonValue;
use std::fmt;

/// AI-inferred risk scores, each 0 (no risk) to 100 (critical).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRiskProfile {
    #[serde(deserialize_with = "deserialize_score")]
    pub overall_score: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub cardiovascular: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub metabolic: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub respiratory: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub lifestyle: u8,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub last_updated: Option<i64>,
}

impl Default for HealthRiskProfile {
    fn default() -> Self {
        Self {
            overall_score: 0,
            cardiovascular: 0,
            metabolic: 0,
            respiratory: 0,
            lifestyle: 0,
            summary: "No assessment yet. Chat with Medico to build your health profile.".to_string(),
            last_updated: None,
        }
    }
}

impl HealthRiskProfile {
    /// Category with the highest score, used to phrase the dashboard alert.
    pub fn highest_category(&self) -> (&'static str, u8) {
        [
            ("Cardiovascular", self.cardiovascular),
            ("Metabolic", self.metabolic),
            ("Respiratory", self.respiratory),
            ("Lifestyle", self.lifestyle),
        ]
            .into_iter()
            .fold(("Cardiovascular", 0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalStatus {
    #[serde(alias = "normal", alias = "NORMAL")]
    Normal,
    #[serde(alias = "warning", alias = "WARNING")]
    Warning,
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
}

impl fmt::Display for VitalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VitalStatus::Normal => "Normal",
            VitalStatus::Warning => "Warning",
            VitalStatus::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitalSign {
    pub name: String,
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub value: String,
    pub status: VitalStatus,
}

/// Structured result of a medical report analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRiskAnalysis {
    #[serde(deserialize_with = "deserialize_score")]
    pub risk_score: u8,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub vital_signs: Vec<VitalSign>,
}

impl HealthRiskAnalysis {
    pub fn flagged_vitals(&self) -> impl Iterator<Item = &VitalSign> {
        self.vital_signs.iter().filter(|v| v.status != VitalStatus::Normal)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub date: String,
    pub value: f64,
    pub unit: String,
    #[serde(rename = "type")]
    pub metric_type: String,
}

impl HealthMetric {
    pub fn new(date: &str, value: f64, unit: &str, metric_type: &str) -> Self {
        Self {
            date: date.to_string(),
            value,
            unit: unit.to_string(),
            metric_type: metric_type.to_string(),
        }
    }
}

/// Series shown on an empty dashboard before anything has been extracted.
pub fn sample_metrics() -> Vec<HealthMetric> {
    vec![
        HealthMetric::new("2023-10-01", 180.0, "mg/dL", "Total Cholesterol"),
        HealthMetric::new("2023-11-15", 175.0, "mg/dL", "Total Cholesterol"),
        HealthMetric::new("2024-01-10", 168.0, "mg/dL", "Total Cholesterol"),
        HealthMetric::new("2024-03-20", 95.0, "mg/dL", "Glucose (Fasting)"),
        HealthMetric::new("2024-04-05", 92.0, "mg/dL", "Glucose (Fasting)")
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsHistoryPoint {
    pub name: String,
    pub bp: u32,
    pub heart_rate: u32,
}

/// Wearable snapshot written by the device simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStats {
    pub heart_rate: u32,
    pub steps: u32,
    pub sleep_hours: f64,
    pub blood_pressure: String,
    pub spo2: u32,
    pub temperature: f64,
    pub last_synced: i64,
    pub source: String,
    #[serde(default)]
    pub history: Vec<VitalsHistoryPoint>,
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
    where D: Deserializer<'de>
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Err(serde::de::Error::custom("score is not a number"));
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where D: Deserializer<'de>
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_scores_are_clamped() {
        let json =
            r#"{"overallScore":120,"cardiovascular":-4,"metabolic":42.6,"respiratory":10,"lifestyle":0,"summary":"ok"}"#;
        let profile: HealthRiskProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.overall_score, 100);
        assert_eq!(profile.cardiovascular, 0);
        assert_eq!(profile.metabolic, 43);
        assert_eq!(profile.last_updated, None);
    }

    #[test]
    fn highest_category_picks_max() {
        let profile = HealthRiskProfile {
            metabolic: 70,
            respiratory: 30,
            ..HealthRiskProfile::default()
        };
        assert_eq!(profile.highest_category(), ("Metabolic", 70));
    }

    #[test]
    fn analysis_tolerates_missing_lists_and_numeric_values() {
        let json =
            r#"{
                "riskScore": 35,
                "summary": "Mildly elevated LDL.",
                "vitalSigns": [
                    {"name": "LDL", "value": 162, "status": "Warning"},
                    {"name": "HDL", "value": "55 mg/dL", "status": "normal"}
                ]
            }"#;
        let analysis: HealthRiskAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.risk_score, 35);
        assert!(analysis.key_findings.is_empty());
        assert_eq!(analysis.vital_signs[0].value, "162");
        assert_eq!(analysis.vital_signs[1].status, VitalStatus::Normal);
        assert_eq!(analysis.flagged_vitals().count(), 1);
    }

    #[test]
    fn metric_type_uses_wire_name() {
        let metric = HealthMetric::new("2024-01-01", 5.4, "%", "HbA1c");
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["type"], "HbA1c");
    }
}
