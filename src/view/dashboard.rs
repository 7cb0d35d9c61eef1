//! Chart-ready view models derived from the stored profile and metrics.

use std::collections::BTreeMap;

use crate::models::{ HealthMetric, HealthRiskAnalysis, HealthRiskProfile };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=39 => RiskLevel::Low,
            40..=69 => RiskLevel::Moderate,
            _ => RiskLevel::High,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: u8,
}

fn point(label: &str, value: u8) -> ChartPoint {
    ChartPoint { label: label.to_string(), value }
}

pub fn risk_radar(profile: &HealthRiskProfile) -> Vec<ChartPoint> {
    vec![
        point("Cardio", profile.cardiovascular),
        point("Metabolic", profile.metabolic),
        point("Respiratory", profile.respiratory),
        point("Lifestyle", profile.lifestyle),
        point("Immunity", 100u8.saturating_sub(profile.overall_score))
    ]
}

/// Fixed Mon..Thu baseline, then today's overall score.
pub fn weekly_trend(profile: &HealthRiskProfile) -> Vec<ChartPoint> {
    vec![
        point("Mon", 20),
        point("Tue", 22),
        point("Wed", 18),
        point("Thu", 25),
        point("Fri", profile.overall_score)
    ]
}

/// Alert text when the overall score is above 50.
pub fn high_risk_alert(profile: &HealthRiskProfile) -> Option<String> {
    if profile.overall_score <= 50 {
        return None;
    }
    let (category, score) = profile.highest_category();
    Some(
        format!(
            "High risk detected (overall {}/100). {} risk is your highest at {}/100. Consider consulting a doctor.",
            profile.overall_score,
            category,
            score
        )
    )
}

/// Metrics grouped by type, each series in date order.
pub fn metric_series(metrics: &[HealthMetric]) -> BTreeMap<String, Vec<HealthMetric>> {
    let mut groups: BTreeMap<String, Vec<HealthMetric>> = BTreeMap::new();
    for metric in metrics {
        groups.entry(metric.metric_type.clone()).or_default().push(metric.clone());
    }
    for series in groups.values_mut() {
        series.sort_by(|a, b| a.date.cmp(&b.date));
    }
    groups
}

pub fn report_chart(analysis: &HealthRiskAnalysis) -> Vec<ChartPoint> {
    let score = analysis.risk_score.min(100);
    let vitals = if score > 50 { score - 10 } else { score + 10 };
    vec![
        point("Overall Risk", score),
        point("Vitals", vitals),
        point("Urgency", score),
        point("Complexity", (score + 20).min(100)),
        point("Health Impact", score)
    ]
}

/// Fixed-width text bar for terminal charts.
pub fn bar(value: u8, width: usize) -> String {
    let filled = ((value.min(100) as usize) * width + 50) / 100;
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}
