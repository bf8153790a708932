//! Focusnook - session timer engine for an ambient focus companion.
//!
//! Provides pomodoro cycling, a plain countdown and a stopwatch, with
//! durations and completed-session stats kept in a local SQLite store.
//! Presentation layers read [`TimerState`] snapshots or subscribe to
//! [`TimerEvent`]s, and drive everything through [`TimerService`].

pub mod engine;
pub mod format;
pub mod models;
pub mod service;
pub mod settings;
pub mod stats;
pub mod store;
pub mod ticker;

pub use engine::{CompletionEvent, TimerEngine, TimerError, TimerEvent};
pub use models::{PomodoroPhase, PomodoroSettings, StatsSnapshot, TimerMode, TimerState};
pub use service::TimerService;
pub use settings::{SettingsError, SettingsManager};
pub use stats::StatsAggregator;
pub use store::{Store, StoreError};
