use clap::{ Parser, Subcommand };
use std::path::PathBuf;

use crate::models::{ ChatMode, ReminderCategory };
use crate::view::View;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Medico Assistant: an AI healthcare companion", long_about = None)]
pub struct Args {
    // --- Storage Args ---
    /// User data store type (file, memory)
    #[arg(long, env = "MEDICO_STORE", default_value = "file")]
    pub store: String,

    /// Directory holding the persisted user data when the store type is `file`.
    #[arg(long, env = "MEDICO_DATA_DIR", default_value = ".medico")]
    pub data_dir: PathBuf,

    // --- Generative Model Args ---
    /// API key for the generative model. Falls back to API_KEY when unset.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name (e.g., gemini-2.5-flash)
    #[arg(long, env = "GEMINI_MODEL")] // No default, the client picks one if None
    pub model: Option<String>,

    /// Base URL of the generative language API.
    #[arg(long, env = "GEMINI_BASE_URL")]
    pub base_url: Option<String>,

    /// Timeout in seconds for a single model request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,

    /// Optional JSON file overriding the built-in prompt templates.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- Device Simulator Args ---
    /// Simulated wearable sync delay in milliseconds. Connecting waits 1.5x this.
    #[arg(long, env = "SYNC_DELAY_MS", default_value = "1000")]
    pub sync_delay_ms: u64,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register a new email and sign in.
    Signup {
        email: String,
    },
    /// Sign in with a registered email.
    Login {
        email: String,
    },
    /// Sign out.
    Logout,
    /// Show the signed-in email.
    Whoami,
    /// Send a message to Medico.
    Chat {
        /// Chat mode (chat, medicine, remedy)
        #[arg(long, short, default_value = "chat")]
        mode: ChatMode,
        /// Image or document to attach. May be repeated.
        #[arg(long, short = 'a')]
        attach: Vec<PathBuf>,
        /// Message text. May be empty when an attachment is given.
        message: Vec<String>,
    },
    /// Print the conversation for a chat mode.
    History {
        #[arg(long, short, default_value = "chat")]
        mode: ChatMode,
    },
    /// Reset a chat mode to its greeting.
    ClearChat {
        #[arg(long, short, default_value = "chat")]
        mode: ChatMode,
    },
    /// Analyze a medical report image.
    AnalyzeReport {
        file: PathBuf,
    },
    /// Score health risk from all conversations.
    AssessRisk,
    /// Manage reminders.
    #[command(subcommand)]
    Reminders(ReminderCommand),
    /// Simulated wearable device.
    #[command(subcommand)]
    Device(DeviceCommand),
    /// Render a screen (dashboard, chat, reminders, reports, devices, settings).
    View {
        #[arg(default_value = "dashboard")]
        view: View,
        /// Chat mode shown by the chat screen.
        #[arg(long, short, default_value = "chat")]
        mode: ChatMode,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReminderCommand {
    List,
    Add {
        title: String,
        /// Time of day, HH:mm
        time: String,
        #[arg(long, short, default_value = "medication")]
        category: ReminderCategory,
        /// `daily` or a comma list such as `mon,thu`
        #[arg(long, short, default_value = "daily")]
        days: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        category: Option<ReminderCategory>,
        #[arg(long)]
        days: Option<String>,
    },
    Toggle {
        id: String,
    },
    Delete {
        id: String,
    },
    /// Seed the default reminders when the list is empty.
    Defaults,
    /// Active reminders due at a time today (defaults to now).
    Due {
        time: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum DeviceCommand {
    Connect {
        /// Apple Health, Google Fit, Fitbit or Garmin Connect
        source: String,
    },
    Sync,
    Disconnect,
    Status,
}
