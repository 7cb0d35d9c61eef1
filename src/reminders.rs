use chrono::{ NaiveTime, Weekday };
use log::info;
use thiserror::Error;
use uuid::Uuid;

use crate::models::reminder::every_day;
use crate::models::{ Reminder, ReminderCategory };
use crate::storage::{ StorageError, UserStorage };

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Reminder title cannot be empty")]
    EmptyTitle,
    #[error("Invalid reminder time '{0}', expected HH:mm")]
    InvalidTime(String),
    #[error("{0}")]
    InvalidDays(String),
    #[error("Reminder '{0}' not found")]
    NotFound(String),
    #[error("{0}")]
    Storage(#[from] StorageError),
}

/// Parses `H:mm`/`HH:mm` and returns the normalized `HH:mm` form.
pub fn normalize_time(time: &str) -> Result<String, ReminderError> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| ReminderError::InvalidTime(time.to_string()))
}

/// Time of day, then title. `HH:mm` strings sort the same as the times.
pub fn by_schedule(reminders: &[Reminder]) -> Vec<&Reminder> {
    let mut sorted: Vec<&Reminder> = reminders.iter().collect();
    sorted.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.title.cmp(&b.title)));
    sorted
}

pub fn default_reminders() -> Vec<Reminder> {
    vec![
        Reminder {
            id: "1".to_string(),
            title: "Metformin 500mg".to_string(),
            time: "09:00".to_string(),
            category: ReminderCategory::Medication,
            days: every_day(),
            active: true,
        },
        Reminder {
            id: "2".to_string(),
            title: "Vitamin D".to_string(),
            time: "20:00".to_string(),
            category: ReminderCategory::Medication,
            days: vec![Weekday::Mon, Weekday::Thu],
            active: true,
        }
    ]
}

/// Partial edit; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ReminderUpdate {
    pub title: Option<String>,
    pub time: Option<String>,
    pub category: Option<ReminderCategory>,
    pub days: Option<Vec<Weekday>>,
}

/// A user's reminder list. Every mutation writes the whole list back.
pub struct ReminderBook {
    storage: UserStorage,
    email: String,
    reminders: Vec<Reminder>,
}

impl ReminderBook {
    pub fn load(storage: UserStorage, email: &str) -> Self {
        let reminders = storage.reminders(email);
        Self {
            storage,
            email: email.to_string(),
            reminders,
        }
    }

    fn persist(&self) -> Result<(), ReminderError> {
        self.storage.save_reminders(&self.email, &self.reminders)?;
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, ReminderError> {
        self.reminders
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| ReminderError::NotFound(id.to_string()))
    }

    pub fn add(
        &mut self,
        title: &str,
        time: &str,
        category: ReminderCategory,
        days: Vec<Weekday>
    ) -> Result<Reminder, ReminderError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ReminderError::EmptyTitle);
        }
        let reminder = Reminder {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            time: normalize_time(time)?,
            category,
            days: if days.is_empty() { every_day() } else { dedup_days(days) },
            active: true,
        };
        self.reminders.push(reminder.clone());
        self.persist()?;
        info!("Added reminder '{}' at {}", reminder.title, reminder.time);
        Ok(reminder)
    }

    pub fn edit(&mut self, id: &str, update: ReminderUpdate) -> Result<Reminder, ReminderError> {
        let idx = self.position(id)?;
        let mut edited = self.reminders[idx].clone();
        if let Some(title) = update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ReminderError::EmptyTitle);
            }
            edited.title = title.to_string();
        }
        if let Some(time) = update.time {
            edited.time = normalize_time(&time)?;
        }
        if let Some(category) = update.category {
            edited.category = category;
        }
        if let Some(days) = update.days {
            edited.days = if days.is_empty() { every_day() } else { dedup_days(days) };
        }
        self.reminders[idx] = edited.clone();
        self.persist()?;
        Ok(edited)
    }

    /// Flips `active` and returns the new state.
    pub fn toggle(&mut self, id: &str) -> Result<bool, ReminderError> {
        let idx = self.position(id)?;
        self.reminders[idx].active = !self.reminders[idx].active;
        let active = self.reminders[idx].active;
        self.persist()?;
        Ok(active)
    }

    pub fn delete(&mut self, id: &str) -> Result<Reminder, ReminderError> {
        let idx = self.position(id)?;
        let removed = self.reminders.remove(idx);
        self.persist()?;
        info!("Deleted reminder '{}'", removed.title);
        Ok(removed)
    }

    /// Replaces an empty list with the default seed. Returns whether it seeded.
    pub fn seed_defaults(&mut self) -> Result<bool, ReminderError> {
        if !self.reminders.is_empty() {
            return Ok(false);
        }
        self.reminders = default_reminders();
        self.persist()?;
        Ok(true)
    }

    pub fn list(&self) -> Vec<&Reminder> {
        by_schedule(&self.reminders)
    }

    pub fn due_at(&self, time: NaiveTime, weekday: Weekday) -> Vec<&Reminder> {
        let wanted = time.format("%H:%M").to_string();
        self.list()
            .into_iter()
            .filter(|r| r.active && r.time == wanted && r.days.contains(&weekday))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }
}

/// Removes repeats and orders Mon..Sun.
fn dedup_days(mut days: Vec<Weekday>) -> Vec<Weekday> {
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    days
}

/// Accepts `daily`/`every day`, or a comma list like `mon,thu`.
pub fn parse_days(raw: &str) -> Result<Vec<Weekday>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("daily") || raw.eq_ignore_ascii_case("every day") {
        return Ok(every_day());
    }
    raw.split(',')
        .map(|d| d.trim().parse::<Weekday>().map_err(|_| format!("Invalid weekday: '{}'", d.trim())))
        .collect::<Result<Vec<_>, _>>()
        .map(dedup_days)
}
