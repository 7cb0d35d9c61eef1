//! Plain-text renderers, one per view.

use chrono::{ Local, TimeZone };

use super::dashboard::{ bar, high_risk_alert, metric_series, report_chart, risk_radar, weekly_trend, RiskLevel };
use crate::models::{ ChatMode, HealthMetric, HealthRiskAnalysis, HealthStats, Role, UserData };
use crate::reminders::by_schedule;

pub const CHAT_DISCLAIMER: &str =
    "Medico Assistant provides information, not medical diagnosis. Always consult a doctor.";
pub const SETTINGS_DISCLAIMER: &str =
    "Medico Assistant uses advanced AI to help you understand your health data. However, it is not a substitute for professional medical advice. Always consult with a qualified healthcare provider for diagnosis and treatment.";

const BAR_WIDTH: usize = 20;
const DOCUMENT_NOTE_CHARS: usize = 100;

/// Runtime settings shown on the settings screen. Never holds secrets.
#[derive(Debug, Clone)]
pub struct SettingsInfo {
    pub model: String,
    pub store_type: String,
    pub data_dir: String,
    pub prompts_path: Option<String>,
    pub api_key_set: bool,
}

pub struct ScreenContext<'a> {
    pub email: &'a str,
    pub data: &'a UserData,
    pub metrics: &'a [HealthMetric],
    pub health: Option<&'a HealthStats>,
    pub settings: &'a SettingsInfo,
    pub chat_mode: ChatMode,
}

fn format_millis(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "unknown".to_string(),
    }
}

pub fn dashboard(ctx: &ScreenContext<'_>) -> String {
    let profile = ctx.data.risk_profile.clone().unwrap_or_default();
    let level = RiskLevel::from_score(profile.overall_score);
    let mut out = format!(
        "Signed in as {}\nOverall risk: {}/100 ({})\n{}\n",
        ctx.email,
        profile.overall_score,
        level.label(),
        profile.summary
    );
    if let Some(alert) = high_risk_alert(&profile) {
        out.push_str(&format!("\n! {}\n", alert));
    }

    out.push_str("\nRisk breakdown\n");
    for p in risk_radar(&profile) {
        out.push_str(&format!("  {:<12} {} {:>3}\n", p.label, bar(p.value, BAR_WIDTH), p.value));
    }
    out.push_str("\nWeekly trend\n");
    for p in weekly_trend(&profile) {
        out.push_str(&format!("  {:<4} {} {:>3}\n", p.label, bar(p.value, BAR_WIDTH), p.value));
    }

    match ctx.health {
        Some(stats) =>
            out.push_str(
                &format!(
                    "\nLive vitals ({})\n  Heart rate {} bpm | Steps {} | Sleep {:.1} h | BP {} | SpO2 {}% | Temp {:.1} F\n",
                    stats.source,
                    stats.heart_rate,
                    stats.steps,
                    stats.sleep_hours,
                    stats.blood_pressure,
                    stats.spo2,
                    stats.temperature
                )
            ),
        None => out.push_str("\nNo device connected.\n"),
    }

    out.push_str("\nHealth metrics\n");
    for (metric_type, series) in metric_series(ctx.metrics) {
        let points: Vec<String> = series
            .iter()
            .map(|m| format!("{} {} {}", m.date, m.value, m.unit))
            .collect();
        out.push_str(&format!("  {}: {}\n", metric_type, points.join(" -> ")));
    }
    out
}

pub fn chat(ctx: &ScreenContext<'_>) -> String {
    let mut out = format!("[{}] {}\n\n", ctx.chat_mode.label(), CHAT_DISCLAIMER);
    let messages = ctx.data.chat(ctx.chat_mode);
    if messages.is_empty() {
        out.push_str(&format!("Medico: {}\n", ctx.chat_mode.greeting()));
        return out;
    }
    for msg in messages {
        let speaker = match msg.role {
            Role::User => "You",
            Role::Model => "Medico",
            Role::System => "System",
        };
        out.push_str(&format!("{} ({}): {}\n", speaker, format_millis(msg.timestamp), msg.text));
        for att in &msg.attachments {
            out.push_str(&format!("  [attachment: {}]\n", att.name.as_deref().unwrap_or(&att.mime_type)));
        }
    }
    out
}

pub fn reminders(ctx: &ScreenContext<'_>) -> String {
    if ctx.data.reminders.is_empty() {
        return "No reminders yet. Add one with `medico reminders add`.\n".to_string();
    }
    let mut out = String::new();
    for r in by_schedule(&ctx.data.reminders) {
        out.push_str(
            &format!(
                "  [{}] {} {:<24} {:<12} {}  ({})\n",
                if r.active { "x" } else { " " },
                r.time,
                r.title,
                r.category.to_string(),
                r.days_label(),
                r.id
            )
        );
    }
    out
}

pub fn reports(ctx: &ScreenContext<'_>) -> String {
    let mut out = match &ctx.data.last_report {
        Some(analysis) => report_analysis(analysis),
        None => "No report analyzed yet. Run `medico analyze-report <file>`.\n".to_string(),
    };
    out.push_str("\nUploaded documents\n");
    let documents = ctx.data.documents();
    if documents.is_empty() {
        out.push_str("  None yet. Attach a lab report or prescription in chat with `medico chat --attach <file>`.\n");
    }
    for (i, (mode, msg)) in documents.iter().enumerate() {
        let names = msg.attachments
            .iter()
            .map(|a| a.name.as_deref().unwrap_or(&a.mime_type))
            .collect::<Vec<_>>()
            .join(", ");
        let note: String = msg.text.trim().chars().take(DOCUMENT_NOTE_CHARS).collect();
        out.push_str(
            &format!(
                "  {}. {}  {}  {}\n     {}\n",
                i + 1,
                names,
                format_millis(msg.timestamp),
                mode.label(),
                if note.is_empty() { "Uploaded via chat" } else { note.as_str() }
            )
        );
    }
    out
}

fn report_analysis(analysis: &HealthRiskAnalysis) -> String {
    let level = RiskLevel::from_score(analysis.risk_score);
    let mut out = format!(
        "Risk score: {}/100 ({})\n{}\n\nRisk profile\n",
        analysis.risk_score,
        level.label(),
        analysis.summary
    );
    for p in report_chart(analysis) {
        out.push_str(&format!("  {:<14} {} {:>3}\n", p.label, bar(p.value, BAR_WIDTH), p.value));
    }
    out.push_str("\nKey findings\n");
    for finding in &analysis.key_findings {
        out.push_str(&format!("  - {}\n", finding));
    }
    out.push_str("\nRecommendations\n");
    for rec in &analysis.recommendations {
        out.push_str(&format!("  - {}\n", rec));
    }
    if !analysis.vital_signs.is_empty() {
        out.push_str("\nVital signs\n");
        for v in &analysis.vital_signs {
            out.push_str(&format!("  {:<20} {:<14} {}\n", v.name, v.value, v.status.to_string()));
        }
    }
    out
}

pub fn devices(ctx: &ScreenContext<'_>) -> String {
    let Some(stats) = ctx.health else {
        return format!(
            "No device connected. Supported: {}\n",
            crate::device::SOURCES.join(", ")
        );
    };
    let mut out = format!(
        "Connected: {} (last synced {})\n  Heart rate   {} bpm\n  Steps        {}\n  Sleep        {:.1} h\n  Blood press. {}\n  SpO2         {}%\n  Temperature  {:.1} F\n\n7-day history\n",
        stats.source,
        format_millis(stats.last_synced),
        stats.heart_rate,
        stats.steps,
        stats.sleep_hours,
        stats.blood_pressure,
        stats.spo2,
        stats.temperature
    );
    for p in &stats.history {
        out.push_str(&format!("  {:<4} BP {:>3}  HR {:>3}\n", p.name, p.bp, p.heart_rate));
    }
    out
}

pub fn settings(ctx: &ScreenContext<'_>) -> String {
    let s = ctx.settings;
    format!(
        "Account:   {}\nModel:     {}\nAPI key:   {}\nStore:     {} ({})\nPrompts:   {}\n\n{}\n",
        ctx.email,
        s.model,
        if s.api_key_set { "configured" } else { "missing" },
        s.store_type,
        s.data_dir,
        s.prompts_path.as_deref().unwrap_or("built-in"),
        SETTINGS_DISCLAIMER
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ Attachment, HealthRiskProfile, Message, Reminder, ReminderCategory };
    use crate::reminders::default_reminders;
    use crate::view::{ View, ViewRouter };

    fn settings() -> SettingsInfo {
        SettingsInfo {
            model: "gemini-2.5-flash".into(),
            store_type: "memory".into(),
            data_dir: ".medico".into(),
            prompts_path: None,
            api_key_set: false,
        }
    }

    fn render(view: View, data: &UserData) -> String {
        let settings = settings();
        let metrics = crate::models::health::sample_metrics();
        let ctx = ScreenContext {
            email: "a@b.co",
            data,
            metrics: &metrics,
            health: None,
            settings: &settings,
            chat_mode: ChatMode::Chat,
        };
        let mut router = ViewRouter::default();
        router.navigate(view);
        router.render(&ctx)
    }

    #[test]
    fn dashboard_shows_alert_for_high_risk() {
        let mut data = UserData::default();
        data.risk_profile = Some(HealthRiskProfile {
            overall_score: 72,
            cardiovascular: 80,
            metabolic: 30,
            respiratory: 20,
            lifestyle: 40,
            summary: "Elevated".into(),
            last_updated: None,
        });
        let out = render(View::Dashboard, &data);
        assert!(out.starts_with("== Health Overview =="));
        assert!(out.contains("Overall risk: 72/100 (High)"));
        assert!(out.contains("Cardiovascular risk is your highest"));
        assert!(out.contains("Total Cholesterol: 2023-10-01"));
    }

    #[test]
    fn each_view_renders_its_own_screen() {
        let mut data = UserData::default();
        data.reminders = default_reminders();
        data.chats.insert(ChatMode::Chat, vec![Message::user("hello", Vec::new())]);

        assert!(render(View::Chat, &data).contains("You ("));
        assert!(render(View::Reminders, &data).contains("Metformin 500mg"));
        assert!(render(View::Reports, &data).contains("No report analyzed yet"));
        assert!(render(View::Devices, &data).contains("No device connected"));
        let settings = render(View::Settings, &data);
        assert!(settings.contains("API key:   missing"));
        assert!(settings.contains("not a substitute"));
    }

    #[test]
    fn report_screen_lists_findings() {
        let mut data = UserData::default();
        data.last_report = Some(HealthRiskAnalysis {
            risk_score: 40,
            summary: "Mostly fine".into(),
            key_findings: vec!["LDL borderline".into()],
            recommendations: vec!["Recheck in 3 months".into()],
            vital_signs: vec![],
        });
        let out = render(View::Reports, &data);
        assert!(out.contains("Risk score: 40/100 (Moderate)"));
        assert!(out.contains("- LDL borderline"));
        assert!(out.contains("Complexity"));
    }

    #[test]
    fn report_screen_lists_uploaded_documents() {
        let mut data = UserData::default();
        assert!(render(View::Reports, &data).contains("None yet. Attach a lab report"));

        let scan = Attachment::from_bytes("image/png", b"png", Some("lipids.png".into()));
        let unnamed = Attachment::from_bytes("image/jpeg", b"jpg", None);
        data.chats.insert(ChatMode::Chat, vec![
            Message::model("Hello!"),
            Message::user("Here is my lipid panel", vec![scan]),
            Message::user("no file here", Vec::new())
        ]);
        data.chats.insert(ChatMode::Medicine, vec![Message::user("", vec![unnamed])]);

        let out = render(View::Reports, &data);
        assert!(out.contains("No report analyzed yet"));
        assert!(out.contains("lipids.png"));
        assert!(out.contains("Consultation\n     Here is my lipid panel"));
        assert!(out.contains("image/jpeg"));
        assert!(out.contains("Medicine Guide\n     Uploaded via chat"));
        assert!(!out.contains("no file here"));
    }

    #[test]
    fn reminder_screen_orders_by_time() {
        let mut data = UserData::default();
        data.reminders = default_reminders();
        data.reminders.push(Reminder {
            id: "3".into(),
            title: "Morning walk".into(),
            time: "07:00".into(),
            category: ReminderCategory::Exercise,
            days: Vec::new(),
            active: true,
        });
        let out = render(View::Reminders, &data);
        let walk = out.find("Morning walk").unwrap();
        let metformin = out.find("Metformin 500mg").unwrap();
        let vitamin = out.find("Vitamin D").unwrap();
        assert!(walk < metformin && metformin < vitamin);
    }
}
