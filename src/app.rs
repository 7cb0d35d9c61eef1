use chrono::{ Datelike, Local, NaiveTime };
use log::{ error, warn };
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{ Auth, LOGIN_SUCCESS, SIGNUP_SUCCESS };
use crate::chat::{ reset_chat, ChatSession };
use crate::cli::{ Args, Command, DeviceCommand, ReminderCommand };
use crate::companion::Companion;
use crate::config::prompt::load_prompts;
use crate::device::DeviceSimulator;
use crate::error::{ CompanionError, Result };
use crate::llm::{ new_client, GenerativeClient, LlmConfig, UnavailableClient, DEFAULT_MODEL };
use crate::models::{ Attachment, ChatMode, HealthRiskProfile };
use crate::reminders::{ parse_days, ReminderBook, ReminderError, ReminderUpdate };
use crate::storage::{ initialize_store, UserStorage };
use crate::view::screens::SettingsInfo;
use crate::view::{ ScreenContext, View, ViewRouter };

/// Resolves the API key, falling back to the generic `API_KEY` variable.
pub fn resolve_api_key(args: &Args) -> Option<String> {
    args.api_key
        .clone()
        .or_else(|| std::env::var("API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
}

/// Wires storage, the model client and the feature modules behind the CLI.
pub struct App {
    args: Args,
    storage: UserStorage,
    api_key: Option<String>,
    client: Option<Arc<dyn GenerativeClient>>,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let store = initialize_store(&args.store, &args.data_dir)?;
        let api_key = resolve_api_key(&args);
        Ok(Self {
            args,
            storage: UserStorage::new(store),
            api_key,
            client: None,
        })
    }

    pub fn with_storage(args: Args, storage: UserStorage) -> Self {
        let api_key = resolve_api_key(&args);
        Self { args, storage, api_key, client: None }
    }

    /// Uses `client` instead of building one from the arguments.
    pub fn with_client(mut self, client: Arc<dyn GenerativeClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn storage(&self) -> &UserStorage {
        &self.storage
    }

    /// Without a usable client the companion still runs; its requests fail
    /// and each feature falls back the way it does for any model error.
    fn companion(&self) -> Result<Companion> {
        let config = LlmConfig {
            api_key: self.api_key.clone(),
            model: self.args.model.clone(),
            base_url: self.args.base_url.clone(),
            timeout: Some(Duration::from_secs(self.args.request_timeout_secs)),
        };
        let client: Arc<dyn GenerativeClient> = match &self.client {
            Some(client) => client.clone(),
            None =>
                match new_client(&config) {
                    Ok(client) => client,
                    Err(e) => {
                        warn!("Model client unavailable, using fallback replies: {}", e);
                        let model = config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
                        Arc::new(UnavailableClient::new(model, e.to_string()))
                    }
                }
        };
        let prompts = load_prompts(self.args.prompts_path.as_deref())?;
        Ok(Companion::new(client, prompts))
    }

    fn signed_in(&self) -> Result<String> {
        self.storage.current_user().ok_or(CompanionError::NotSignedIn)
    }

    fn simulator(&self) -> DeviceSimulator {
        let sync = Duration::from_millis(self.args.sync_delay_ms);
        DeviceSimulator::new(self.storage.clone()).with_delays(sync.mul_f32(1.5), sync)
    }

    fn settings_info(&self) -> SettingsInfo {
        SettingsInfo {
            model: self.args.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            store_type: self.args.store.clone(),
            data_dir: self.args.data_dir.display().to_string(),
            prompts_path: self.args.prompts_path.clone(),
            api_key_set: self.api_key.is_some(),
        }
    }

    pub async fn execute(&self, command: Command) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let auth = Auth::new(self.storage.clone());
        let output = match command {
            Command::Signup { email } => {
                let email = auth.sign_up(&email)?;
                format!("{}\nSigned in as {}", SIGNUP_SUCCESS, email)
            }
            Command::Login { email } => {
                let email = auth.login(&email)?;
                format!("{}\nSigned in as {}", LOGIN_SUCCESS, email)
            }
            Command::Logout => {
                auth.logout()?;
                "Signed out.".to_string()
            }
            Command::Whoami => auth.current_user().unwrap_or_else(|| "Not signed in.".to_string()),
            Command::Chat { mode, attach, message } => {
                let email = self.signed_in()?;
                let attachments = attach
                    .iter()
                    .map(Attachment::from_path)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(CompanionError::from)?;
                let mut session = ChatSession::open(self.storage.clone(), self.companion()?, &email, mode);
                let outcome = session.send(&message.join(" "), attachments).await?;
                let mut out = format!("Medico: {}", outcome.reply.text);
                for m in &outcome.metrics {
                    out.push_str(&format!("\n  + recorded {} {} {} ({})", m.metric_type, m.value, m.unit, m.date));
                }
                out
            }
            Command::History { mode } => {
                let email = self.signed_in()?;
                let data = self.storage.user_data(&email);
                let messages = data.chat(mode);
                if messages.is_empty() {
                    format!("Medico: {}", mode.greeting())
                } else {
                    messages
                        .iter()
                        .map(|m| format!("{}: {}", m.role.as_str(), m.text))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::ClearChat { mode } => {
                let email = self.signed_in()?;
                reset_chat(&self.storage, &email, mode)?;
                format!("{} chat cleared.", mode.label())
            }
            Command::AnalyzeReport { file } => {
                let email = self.signed_in()?;
                let report = Attachment::from_path(&file).map_err(CompanionError::from)?;
                let analysis = match self.companion()?.analyze_medical_report(&report).await {
                    Ok(a) => a,
                    Err(e) => {
                        error!("Report analysis failed: {}", e);
                        return Err("Failed to analyze report. Please try again with a clearer image.".into());
                    }
                };
                self.storage.save_last_report(&email, &analysis)?;
                let mut router = ViewRouter::default();
                router.navigate(View::Reports);
                self.render(&router, &email, ChatMode::Chat)?
            }
            Command::AssessRisk => {
                let email = self.signed_in()?;
                let data = self.storage.user_data(&email);
                let profile = match self.companion()?.assess_risk(&data.all_messages()).await {
                    Ok(p) => p,
                    Err(e) => {
                        error!("Risk assessment failed, keeping default profile: {}", e);
                        HealthRiskProfile::default()
                    }
                };
                self.storage.save_risk_profile(&email, &profile)?;
                format!(
                    "Overall {}/100 | Cardiovascular {} | Metabolic {} | Respiratory {} | Lifestyle {}\n{}",
                    profile.overall_score,
                    profile.cardiovascular,
                    profile.metabolic,
                    profile.respiratory,
                    profile.lifestyle,
                    profile.summary
                )
            }
            Command::Reminders(cmd) => self.reminders(cmd)?,
            Command::Device(cmd) => self.device(cmd).await?,
            Command::View { view, mode } => {
                let email = self.signed_in()?;
                let mut router = ViewRouter::default();
                router.navigate(view);
                self.render(&router, &email, mode)?
            }
        };
        Ok(output)
    }

    fn render(&self, router: &ViewRouter, email: &str, mode: ChatMode) -> Result<String> {
        let data = self.storage.user_data(email);
        let metrics = self.storage.metrics()?;
        let health = self.storage.health_stats();
        let settings = self.settings_info();
        let ctx = ScreenContext {
            email,
            data: &data,
            metrics: &metrics,
            health: health.as_ref(),
            settings: &settings,
            chat_mode: mode,
        };
        Ok(router.render(&ctx))
    }

    fn reminders(&self, cmd: ReminderCommand) -> Result<String> {
        let email = self.signed_in()?;
        let mut book = ReminderBook::load(self.storage.clone(), &email);
        let output = match cmd {
            ReminderCommand::List => {
                if book.is_empty() {
                    "No reminders yet.".to_string()
                } else {
                    book.list()
                        .iter()
                        .map(|r| {
                            format!(
                                "[{}] {} {} ({}, {}) id={}",
                                if r.active { "on" } else { "off" },
                                r.time,
                                r.title,
                                r.category,
                                r.days_label(),
                                r.id
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ReminderCommand::Add { title, time, category, days } => {
                let days = parse_days(&days).map_err(ReminderError::InvalidDays)?;
                let r = book.add(&title, &time, category, days)?;
                format!("Added '{}' at {} ({}). id={}", r.title, r.time, r.days_label(), r.id)
            }
            ReminderCommand::Edit { id, title, time, category, days } => {
                let days = days
                    .map(|d| parse_days(&d))
                    .transpose()
                    .map_err(ReminderError::InvalidDays)?;
                let r = book.edit(&id, ReminderUpdate { title, time, category, days })?;
                format!("Updated '{}' at {} ({}).", r.title, r.time, r.days_label())
            }
            ReminderCommand::Toggle { id } => {
                let active = book.toggle(&id)?;
                format!("Reminder {} is now {}.", id, if active { "on" } else { "off" })
            }
            ReminderCommand::Delete { id } => {
                let removed = book.delete(&id)?;
                format!("Deleted '{}'.", removed.title)
            }
            ReminderCommand::Defaults => {
                if book.seed_defaults()? {
                    "Added the default reminders.".to_string()
                } else {
                    "Reminders already exist; defaults not added.".to_string()
                }
            }
            ReminderCommand::Due { time } => {
                let now = Local::now();
                let at = match time {
                    Some(t) =>
                        NaiveTime::parse_from_str(t.trim(), "%H:%M").map_err(|_|
                            ReminderError::InvalidTime(t.clone())
                        )?,
                    None => now.time(),
                };
                let due = book.due_at(at, now.weekday());
                if due.is_empty() {
                    format!("Nothing due at {}.", at.format("%H:%M"))
                } else {
                    due.iter()
                        .map(|r| format!("Time to take: {} ({})", r.title, r.time))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
        };
        Ok(output)
    }

    async fn device(&self, cmd: DeviceCommand) -> Result<String> {
        let mut sim = self.simulator();
        let output = match cmd {
            DeviceCommand::Connect { source } => {
                let stats = sim.connect(&source).await?;
                format!("Connected to {}. HR {} bpm, {} steps.", stats.source, stats.heart_rate, stats.steps)
            }
            DeviceCommand::Sync => {
                match sim.resync().await? {
                    Some(stats) => format!("Synced {}. HR {} bpm, {} steps.", stats.source, stats.heart_rate, stats.steps),
                    None => "No device connected.".to_string(),
                }
            }
            DeviceCommand::Disconnect => {
                sim.disconnect()?;
                "Device disconnected.".to_string()
            }
            DeviceCommand::Status => {
                match sim.status() {
                    Some(stats) => format!("{} connected. HR {} bpm, {} steps, sleep {:.1} h.", stats.source, stats.heart_rate, stats.steps, stats.sleep_hours),
                    None => "No device connected.".to_string(),
                }
            }
        };
        Ok(output)
    }
}
