//! Data models for the focus timer.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of focus sessions per cycle; every fourth completion earns a long break.
pub const FOCUS_SESSIONS_PER_CYCLE: u32 = 4;

/// Duration a plain timer resets to.
pub const DEFAULT_TIMER_SECS: u32 = 10 * 60;

/// Quick-pick durations for the plain timer: 10m, 25m, 40m, 50m and 1h.
pub const TIMER_PRESETS: [u32; 5] = [10 * 60, 25 * 60, 40 * 60, 50 * 60, 60 * 60];

/// Top-level timer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    /// Focus/break cycling with automatic advance.
    #[default]
    Pomodoro,
    /// Single countdown that stops at zero.
    Timer,
    /// Counts up until paused or reset.
    Stopwatch,
}

impl TimerMode {
    /// Human-readable name of the mode.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pomodoro => "Pomodoro",
            Self::Timer => "Timer",
            Self::Stopwatch => "Stopwatch",
        }
    }

    /// Returns true for modes that count down towards zero.
    pub fn is_countdown(&self) -> bool {
        !matches!(self, Self::Stopwatch)
    }
}

/// Pomodoro sub-state. Only meaningful while the mode is [`TimerMode::Pomodoro`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PomodoroPhase {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl PomodoroPhase {
    /// Human-readable name of the phase.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Focus => "Focus",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }

    /// Returns true for the short and long breaks.
    pub fn is_break(&self) -> bool {
        !matches!(self, Self::Focus)
    }
}

/// Live timer state. Only the engine can change it; everyone else reads snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    mode: TimerMode,
    phase: PomodoroPhase,
    /// Remaining seconds for countdowns, elapsed seconds for the stopwatch.
    secs: u32,
    /// Duration the current countdown was armed with.
    total_secs: u32,
    is_running: bool,
    completed_focus_count: u32,
}

impl TimerState {
    /// Initial state: a paused focus phase of the given length.
    pub(crate) fn new(focus_secs: u32) -> Self {
        Self {
            mode: TimerMode::Pomodoro,
            phase: PomodoroPhase::Focus,
            secs: focus_secs,
            total_secs: focus_secs,
            is_running: false,
            completed_focus_count: 0,
        }
    }

    /// Returns the current mode.
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Returns the pomodoro phase (stays at its last value outside pomodoro mode).
    pub fn phase(&self) -> PomodoroPhase {
        self.phase
    }

    /// Returns true while the timer is counting.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Returns the number of focus phases finished since start or the last explicit reset.
    pub fn completed_focus_count(&self) -> u32 {
        self.completed_focus_count
    }

    /// The displayed value: remaining time for countdowns, elapsed time for the stopwatch.
    pub fn display_secs(&self) -> u32 {
        self.secs
    }

    /// Returns the duration the current countdown was armed with.
    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    /// Returns the remaining seconds for countdown modes.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.mode.is_countdown().then_some(self.secs)
    }

    /// Returns the elapsed seconds in stopwatch mode.
    pub fn elapsed_secs(&self) -> Option<u32> {
        (!self.mode.is_countdown()).then_some(self.secs)
    }

    /// Returns the progress (0.0 to 1.0) of a countdown.
    pub fn progress_percent(&self) -> Option<f32> {
        if !self.mode.is_countdown() {
            return None;
        }
        if self.total_secs == 0 {
            return Some(1.0);
        }
        let remaining = self.secs.min(self.total_secs);
        Some(1.0 - (remaining as f32 / self.total_secs as f32))
    }

    /// Position inside the current focus cycle (0..4), one dot per completed focus.
    pub fn cycle_position(&self) -> u32 {
        self.completed_focus_count % FOCUS_SESSIONS_PER_CYCLE
    }

    /// Splits the displayed value into hours, minutes and seconds, e.g. to pre-fill an editor.
    pub fn split_hms(&self) -> (u32, u32, u32) {
        (self.secs / 3600, (self.secs % 3600) / 60, self.secs % 60)
    }

    pub(crate) fn set_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
    }

    pub(crate) fn set_phase(&mut self, phase: PomodoroPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.is_running = running;
    }

    /// Arms a countdown (or zeroes the stopwatch) at `secs`.
    pub(crate) fn arm(&mut self, secs: u32) {
        self.secs = secs;
        self.total_secs = if self.mode.is_countdown() { secs } else { 0 };
    }

    pub(crate) fn count_down(&mut self) {
        self.secs = self.secs.saturating_sub(1);
    }

    pub(crate) fn count_up(&mut self) {
        self.secs = self.secs.saturating_add(1);
    }

    pub(crate) fn increment_focus_count(&mut self) -> u32 {
        self.completed_focus_count += 1;
        self.completed_focus_count
    }

    pub(crate) fn reset_focus_count(&mut self) {
        self.completed_focus_count = 0;
    }
}

/// User-configurable pomodoro durations, in minutes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PomodoroSettings {
    /// Duration of a focus session in minutes.
    #[serde(rename = "focus")]
    pub focus_mins: u32,
    /// Duration of a short break in minutes.
    #[serde(rename = "shortBreak")]
    pub short_break_mins: u32,
    /// Duration of a long break in minutes.
    #[serde(rename = "longBreak")]
    pub long_break_mins: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            focus_mins: 25,
            short_break_mins: 5,
            long_break_mins: 15,
        }
    }
}

impl PomodoroSettings {
    /// Returns the configured minutes for `phase`.
    pub fn minutes_for(&self, phase: PomodoroPhase) -> u32 {
        match phase {
            PomodoroPhase::Focus => self.focus_mins,
            PomodoroPhase::ShortBreak => self.short_break_mins,
            PomodoroPhase::LongBreak => self.long_break_mins,
        }
    }

    /// Returns the configured duration of `phase` in seconds.
    pub fn secs_for(&self, phase: PomodoroPhase) -> u32 {
        self.minutes_for(phase).saturating_mul(60)
    }
}

/// Today's bucket of completed sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub sessions: u32,
    pub minutes: u32,
    /// Day the bucket belongs to. Unreadable values become [`NaiveDate::MIN`],
    /// which forces a rollover without touching the totals.
    #[serde(default = "unknown_date", deserialize_with = "lenient_date")]
    pub last_date: NaiveDate,
}

/// Layout written by older builds (`Sun Mar 10 2024`).
const LEGACY_DATE_FORMAT: &str = "%a %b %d %Y";

fn unknown_date() -> NaiveDate {
    NaiveDate::MIN
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, LEGACY_DATE_FORMAT))
        .ok()
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_date).unwrap_or_else(unknown_date))
}

impl DailyStats {
    /// Creates an empty bucket for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            sessions: 0,
            minutes: 0,
            last_date: date,
        }
    }
}

/// All-time bucket of completed sessions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalStats {
    pub sessions: u32,
    pub minutes: u32,
}

/// Persisted statistics record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub daily: DailyStats,
    pub total: TotalStats,
}

impl StatsSnapshot {
    /// Creates empty stats whose daily bucket belongs to `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            daily: DailyStats::new(today),
            total: TotalStats::default(),
        }
    }

    /// Returns true when today's bucket does not exceed the all-time bucket.
    pub fn is_consistent(&self) -> bool {
        self.daily.sessions <= self.total.sessions && self.daily.minutes <= self.total.minutes
    }
}
