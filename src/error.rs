use thiserror::Error;

use crate::auth::AuthError;
use crate::config::prompt::PromptError;
use crate::device::DeviceError;
use crate::llm::LlmError;
use crate::reminders::ReminderError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Prompt(#[from] PromptError),

    #[error("{0}")]
    Reminder(#[from] ReminderError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Device(#[from] DeviceError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A message needs text or an attachment")]
    EmptyMessage,

    #[error("Not signed in. Run `medico login <email>` or `medico signup <email>` first.")]
    NotSignedIn,
}

pub type Result<T> = std::result::Result<T, CompanionError>;
