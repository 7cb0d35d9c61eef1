mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use log::{ error, info, warn };
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::models::health::sample_metrics;
use crate::models::{
    ChatMode,
    HealthMetric,
    HealthRiskAnalysis,
    HealthRiskProfile,
    HealthStats,
    Message,
    Reminder,
    UserData,
};

pub const USERS_KEY: &str = "medico_users";
pub const CURRENT_USER_KEY: &str = "medico_current_user";
pub const DATA_PREFIX: &str = "medico_data_";
pub const HEALTH_DATA_KEY: &str = "medico_health_data";
pub const METRICS_KEY: &str = "medico_metrics";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unsupported store type: {0}")]
    UnsupportedStore(String),
}

/// Origin-scoped string map. Values are opaque to the store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub fn create_store(
    store_type: &str,
    data_dir: &Path
) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    match store_type.to_lowercase().as_str() {
        "file" => {
            let store = FileStore::open(data_dir)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        _ => Err(StorageError::UnsupportedStore(store_type.to_string())),
    }
}

pub fn initialize_store(
    store_type: &str,
    data_dir: &Path
) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    info!("User data will be stored in: {} at {}", store_type, data_dir.display());
    create_store(store_type, data_dir)
}

/// Typed access to the records the companion keeps in a [`KeyValueStore`].
///
/// Reads are forgiving: a missing or unreadable value yields the default
/// instead of an error, so a damaged entry never locks a user out.
#[derive(Clone)]
pub struct UserStorage {
    store: Arc<dyn KeyValueStore>,
}

impl UserStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return None;
            }
            Err(e) => {
                error!("Failed to read '{}': {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable value under '{}': {}", key, e);
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    // --- Auth ---

    pub fn current_user(&self) -> Option<String> {
        match self.store.get(CURRENT_USER_KEY) {
            Ok(user) => user.filter(|u| !u.is_empty()),
            Err(e) => {
                error!("Failed to read current user: {}", e);
                None
            }
        }
    }

    pub fn set_current_user(&self, email: Option<&str>) -> Result<(), StorageError> {
        match email {
            Some(email) => self.store.set(CURRENT_USER_KEY, email),
            None => self.store.remove(CURRENT_USER_KEY),
        }
    }

    pub fn users(&self) -> Vec<String> {
        self.read_json(USERS_KEY).unwrap_or_default()
    }

    /// Returns `false` when the email is already registered.
    pub fn register_user(&self, email: &str) -> Result<bool, StorageError> {
        let mut users = self.users();
        if users.iter().any(|u| u == email) {
            return Ok(false);
        }
        users.push(email.to_string());
        self.write_json(USERS_KEY, &users)?;
        self.save_user_data(email, &UserData::default())?;
        Ok(true)
    }

    pub fn verify_user(&self, email: &str) -> bool {
        self.users().iter().any(|u| u == email)
    }

    // --- User data ---

    fn data_key(email: &str) -> String {
        format!("{}{}", DATA_PREFIX, email)
    }

    pub fn user_data(&self, email: &str) -> UserData {
        match self.read_json::<JsonValue>(&Self::data_key(email)) {
            Some(value) => UserData::from_value(value),
            None => UserData::default(),
        }
    }

    pub fn save_user_data(&self, email: &str, data: &UserData) -> Result<(), StorageError> {
        self.write_json(&Self::data_key(email), data)
    }

    pub fn save_chats(
        &self,
        email: &str,
        mode: ChatMode,
        messages: &[Message]
    ) -> Result<(), StorageError> {
        let mut data = self.user_data(email);
        data.chats.insert(mode, messages.to_vec());
        self.save_user_data(email, &data)
    }

    pub fn save_risk_profile(
        &self,
        email: &str,
        profile: &HealthRiskProfile
    ) -> Result<(), StorageError> {
        let mut data = self.user_data(email);
        data.risk_profile = Some(profile.clone());
        self.save_user_data(email, &data)
    }

    pub fn save_last_report(
        &self,
        email: &str,
        report: &HealthRiskAnalysis
    ) -> Result<(), StorageError> {
        let mut data = self.user_data(email);
        data.last_report = Some(report.clone());
        self.save_user_data(email, &data)
    }

    pub fn save_reminders(&self, email: &str, reminders: &[Reminder]) -> Result<(), StorageError> {
        let mut data = self.user_data(email);
        data.reminders = reminders.to_vec();
        self.save_user_data(email, &data)
    }

    pub fn reminders(&self, email: &str) -> Vec<Reminder> {
        self.user_data(email).reminders
    }

    // --- Device snapshot ---

    pub fn health_stats(&self) -> Option<HealthStats> {
        self.read_json(HEALTH_DATA_KEY)
    }

    pub fn save_health_stats(&self, stats: &HealthStats) -> Result<(), StorageError> {
        self.write_json(HEALTH_DATA_KEY, stats)
    }

    pub fn clear_health_stats(&self) -> Result<(), StorageError> {
        self.store.remove(HEALTH_DATA_KEY)
    }

    // --- Extracted metrics ---

    /// Seeds the sample series the first time metrics are read.
    pub fn metrics(&self) -> Result<Vec<HealthMetric>, StorageError> {
        if self.store.get(METRICS_KEY)?.is_none() {
            let seed = sample_metrics();
            self.write_json(METRICS_KEY, &seed)?;
            return Ok(seed);
        }
        Ok(self.read_json(METRICS_KEY).unwrap_or_default())
    }

    pub fn append_metrics(&self, new_metrics: &[HealthMetric]) -> Result<Vec<HealthMetric>, StorageError> {
        let mut all = self.metrics()?;
        all.extend_from_slice(new_metrics);
        self.write_json(METRICS_KEY, &all)?;
        Ok(all)
    }
}
