use chrono::{ DateTime, Datelike, Local, Utc };
use log::{ debug, info };
use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };
use std::time::Duration;
use thiserror::Error;

use crate::models::{ HealthStats, VitalsHistoryPoint };
use crate::storage::{ StorageError, UserStorage };

pub const SOURCES: [&str; 4] = ["Apple Health", "Google Fit", "Fitbit", "Garmin Connect"];

pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_SYNC_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Unsupported device source '{0}'. Choose one of: {sources}", sources = SOURCES.join(", "))]
    UnsupportedSource(String),
    #[error("{0}")]
    Storage(#[from] StorageError),
}

/// Case-insensitive lookup returning the canonical source name.
pub fn resolve_source(name: &str) -> Result<&'static str, DeviceError> {
    let wanted = name.trim();
    SOURCES.iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| DeviceError::UnsupportedSource(name.to_string()))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fabricates one snapshot. The history covers seven days starting tomorrow.
pub fn generate_stats<R: Rng>(rng: &mut R, source: &str, now: DateTime<Local>) -> HealthStats {
    let mut day = now.weekday();
    let history = (0..7)
        .map(|_| {
            day = day.succ();
            VitalsHistoryPoint {
                name: day.to_string(),
                bp: rng.gen_range(115..130),
                heart_rate: rng.gen_range(68..80),
            }
        })
        .collect();

    HealthStats {
        heart_rate: rng.gen_range(72..82),
        steps: rng.gen_range(6500..11500),
        sleep_hours: round1(rng.gen_range(6.0..9.0)),
        blood_pressure: "120/80".to_string(),
        spo2: rng.gen_range(96..100),
        temperature: round1(rng.gen_range(98.4..99.4)),
        last_synced: now.with_timezone(&Utc).timestamp_millis(),
        source: source.to_string(),
        history,
    }
}

/// Stand-in for a wearable integration: waits a little, then writes
/// plausible random vitals to storage.
pub struct DeviceSimulator {
    storage: UserStorage,
    connect_delay: Duration,
    sync_delay: Duration,
    rng: StdRng,
}

impl DeviceSimulator {
    pub fn new(storage: UserStorage) -> Self {
        Self {
            storage,
            connect_delay: DEFAULT_CONNECT_DELAY,
            sync_delay: DEFAULT_SYNC_DELAY,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_delays(mut self, connect: Duration, sync: Duration) -> Self {
        self.connect_delay = connect;
        self.sync_delay = sync;
        self
    }

    pub async fn connect(&mut self, source: &str) -> Result<HealthStats, DeviceError> {
        let source = resolve_source(source)?;
        info!("Connecting to {}...", source);
        tokio::time::sleep(self.connect_delay).await;
        self.sync(source).await
    }

    pub async fn sync(&mut self, source: &str) -> Result<HealthStats, DeviceError> {
        let source = resolve_source(source)?;
        debug!("Syncing {} (delay {:?})", source, self.sync_delay);
        tokio::time::sleep(self.sync_delay).await;
        let stats = generate_stats(&mut self.rng, source, Local::now());
        self.storage.save_health_stats(&stats)?;
        info!("Synced {}: HR {} bpm, {} steps", source, stats.heart_rate, stats.steps);
        Ok(stats)
    }

    /// Re-syncs the connected source, if any.
    pub async fn resync(&mut self) -> Result<Option<HealthStats>, DeviceError> {
        match self.status() {
            Some(current) => Ok(Some(self.sync(&current.source).await?)),
            None => Ok(None),
        }
    }

    pub fn disconnect(&self) -> Result<(), DeviceError> {
        self.storage.clear_health_stats()?;
        info!("Device disconnected");
        Ok(())
    }

    pub fn status(&self) -> Option<HealthStats> {
        self.storage.health_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn simulator(storage: UserStorage) -> DeviceSimulator {
        DeviceSimulator::new(storage).with_seed(7).with_delays(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn generated_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        // 2024-05-01 is a Wednesday.
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for _ in 0..50 {
            let s = generate_stats(&mut rng, "Fitbit", now);
            assert!((72..=81).contains(&s.heart_rate));
            assert!((6500..=11499).contains(&s.steps));
            assert!((6.0..=9.0).contains(&s.sleep_hours));
            assert!((96..=99).contains(&s.spo2));
            assert!((98.4..=99.4).contains(&s.temperature));
            assert_eq!(s.blood_pressure, "120/80");
            assert_eq!(s.history.len(), 7);
            assert!(s.history.iter().all(|p| (115..=129).contains(&p.bp) && (68..=79).contains(&p.heart_rate)));
            assert_eq!(s.history[0].name, "Thu");
            assert_eq!(s.history[6].name, "Wed");
        }
    }

    #[test]
    fn sources_resolve_case_insensitively() {
        assert_eq!(resolve_source("google fit").unwrap(), "Google Fit");
        assert!(matches!(resolve_source("Oura"), Err(DeviceError::UnsupportedSource(_))));
    }

    #[tokio::test]
    async fn connect_writes_and_disconnect_clears() {
        let storage = UserStorage::in_memory();
        let mut sim = simulator(storage.clone());
        assert!(sim.status().is_none());
        assert!(sim.resync().await.unwrap().is_none());

        let stats = sim.connect("garmin connect").await.unwrap();
        assert_eq!(stats.source, "Garmin Connect");
        assert_eq!(storage.health_stats(), Some(stats.clone()));

        let again = sim.resync().await.unwrap().unwrap();
        assert_eq!(again.source, "Garmin Connect");

        sim.disconnect().unwrap();
        assert!(storage.health_stats().is_none());
    }

    #[tokio::test]
    async fn same_seed_same_snapshot() {
        let a = simulator(UserStorage::in_memory()).sync("Fitbit").await.unwrap();
        let b = simulator(UserStorage::in_memory()).sync("Fitbit").await.unwrap();
        assert_eq!(a.heart_rate, b.heart_rate);
        assert_eq!(a.steps, b.steps);
        assert_eq!(a.history, b.history);
    }
}
