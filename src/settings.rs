//! Persisted pomodoro durations.

use crate::models::PomodoroSettings;
use crate::store::{keys, Store, StoreError};
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{field} must be at least 1 minute, got {value}")]
    OutOfRange { field: &'static str, value: u32 },
}

pub struct SettingsManager {
    store: Store,
    current: PomodoroSettings,
}

impl SettingsManager {
    /// Loads settings from the store, falling back to defaults on absent or invalid data.
    pub fn load(store: Store) -> Self {
        let current = match store.try_get::<PomodoroSettings>(keys::POMODORO_SETTINGS) {
            Ok(Some(settings)) => match validate(&settings) {
                Ok(()) => settings,
                Err(e) => {
                    warn!("Stored pomodoro settings are invalid ({}), using defaults", e);
                    PomodoroSettings::default()
                }
            },
            Ok(None) => PomodoroSettings::default(),
            Err(e) => {
                warn!("Could not read pomodoro settings ({}), using defaults", e);
                PomodoroSettings::default()
            }
        };

        Self { store, current }
    }

    pub fn current(&self) -> PomodoroSettings {
        self.current
    }

    /// Validates and stores all three durations as one record.
    ///
    /// A failed write is logged and the new values stay active in memory.
    pub fn save(&mut self, settings: PomodoroSettings) -> Result<(), SettingsError> {
        validate(&settings)?;
        self.current = settings;
        if let Err(e) = self.persist() {
            warn!("Pomodoro settings kept in memory only: {}", e);
        } else {
            info!(
                "Saved pomodoro settings {}/{}/{}",
                settings.focus_mins, settings.short_break_mins, settings.long_break_mins
            );
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.set(keys::POMODORO_SETTINGS, &self.current)
    }
}

fn validate(settings: &PomodoroSettings) -> Result<(), SettingsError> {
    for (field, value) in [
        ("focus", settings.focus_mins),
        ("shortBreak", settings.short_break_mins),
        ("longBreak", settings.long_break_mins),
    ] {
        if value < 1 {
            return Err(SettingsError::OutOfRange { field, value });
        }
    }
    Ok(())
}
