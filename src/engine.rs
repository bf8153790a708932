//! Timer state machine: pomodoro cycling, plain countdown and stopwatch.

use crate::models::{
    PomodoroPhase, PomodoroSettings, StatsSnapshot, TimerMode, TimerState, DEFAULT_TIMER_SECS,
    FOCUS_SESSIONS_PER_CYCLE,
};
use crate::settings::{SettingsError, SettingsManager};
use crate::stats::StatsAggregator;
use crate::store::Store;
use log::{debug, info};
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Duration must be greater than zero")]
    NonPositiveDuration,
    #[error("Duration of {0} seconds is too long")]
    DurationTooLong(u64),
    #[error("The stopwatch has no countdown to set")]
    NoCountdown,
}

/// Completions worth a notification or sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEvent {
    /// A focus phase finished; the next break has started.
    PomodoroComplete { count: u32, is_long_break: bool },
    /// A break finished; the next focus phase has started.
    BreakComplete { was_long_break: bool },
    /// A plain countdown reached zero and stopped.
    TimerComplete,
}

/// Notification sent to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    StateChanged(TimerState),
    Completed(CompletionEvent),
}

/// Owns the timer state and every rule that changes it.
pub struct TimerEngine {
    state: TimerState,
    settings: SettingsManager,
    stats: StatsAggregator,
    observers: Vec<Sender<TimerEvent>>,
    /// Bumped whenever the timer starts, stops or is re-targeted; ticks carry it.
    epoch: u64,
}

impl TimerEngine {
    /// Creates an engine backed by `store` for settings and stats.
    pub fn new(store: Store) -> Self {
        let settings = SettingsManager::load(store.clone());
        let stats = StatsAggregator::load(store);
        Self::with_parts(settings, stats)
    }

    pub fn with_parts(settings: SettingsManager, stats: StatsAggregator) -> Self {
        let state = TimerState::new(settings.current().secs_for(PomodoroPhase::Focus));
        Self {
            state,
            settings,
            stats,
            observers: Vec::new(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> PomodoroSettings {
        self.settings.current()
    }

    pub fn stats(&mut self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Registers a new listener for state changes and completions.
    pub fn subscribe(&mut self) -> Receiver<TimerEvent> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    /// Starts counting. Returns false if already running or a plain timer sits at zero.
    pub fn start(&mut self) -> bool {
        if self.state.is_running() {
            return false;
        }
        if self.state.mode() == TimerMode::Timer && self.state.display_secs() == 0 {
            debug!("Not starting a finished timer");
            return false;
        }

        self.state.set_running(true);
        self.bump_epoch();
        debug!("Started {}", self.state.mode().label());
        self.publish_state();
        true
    }

    /// Pauses a running timer. Returns false if nothing was running.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }

        self.state.set_running(false);
        self.bump_epoch();
        debug!("Paused at {}s", self.state.display_secs());
        self.publish_state();
        true
    }

    /// Starts when paused, pauses when running.
    pub fn toggle(&mut self) -> bool {
        if self.state.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Stops and rewinds the current mode/phase to its configured duration.
    pub fn reset(&mut self) {
        self.state.set_running(false);
        let secs = self.default_secs();
        self.state.arm(secs);
        self.bump_epoch();
        debug!("Reset {} to {}s", self.state.mode().label(), secs);
        self.publish_state();
    }

    /// Switches mode, always stopping and re-initializing.
    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.state.set_running(false);
        self.state.set_mode(mode);
        if mode == TimerMode::Pomodoro {
            self.state.set_phase(PomodoroPhase::Focus);
        }
        let secs = self.default_secs();
        self.state.arm(secs);
        self.bump_epoch();
        info!("Switched to {} mode", mode.label());
        self.publish_state();
    }

    /// Jumps to a pomodoro phase, paused at its full duration.
    /// Returns false outside pomodoro mode.
    pub fn switch_phase(&mut self, phase: PomodoroPhase) -> bool {
        if self.state.mode() != TimerMode::Pomodoro {
            return false;
        }

        self.state.set_running(false);
        self.state.set_phase(phase);
        self.state.arm(self.settings.current().secs_for(phase));
        self.bump_epoch();
        debug!("Switched to {} phase", phase.label());
        self.publish_state();
        true
    }

    /// Sets the countdown to `hours:minutes:seconds`. The running flag is kept.
    pub fn set_custom_duration(
        &mut self,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Result<(), TimerError> {
        if !self.state.mode().is_countdown() {
            return Err(TimerError::NoCountdown);
        }

        let total = u64::from(hours) * 3600 + u64::from(minutes) * 60 + u64::from(seconds);
        if total == 0 {
            return Err(TimerError::NonPositiveDuration);
        }
        let total = u32::try_from(total).map_err(|_| TimerError::DurationTooLong(total))?;

        self.state.arm(total);
        debug!("Custom duration set to {}s", total);
        self.publish_state();
        Ok(())
    }

    /// Applies one of the quick-pick durations (see [`crate::models::TIMER_PRESETS`]).
    pub fn apply_preset(&mut self, secs: u32) -> Result<(), TimerError> {
        self.set_custom_duration(0, 0, secs)
    }

    /// Validates, persists and applies new durations.
    ///
    /// In pomodoro mode the displayed phase picks up its new duration right away,
    /// even mid-countdown. Other phases take effect when they are next entered.
    pub fn save_settings(&mut self, settings: PomodoroSettings) -> Result<(), SettingsError> {
        let previous = self.settings.current();
        self.settings.save(settings)?;

        let phase = self.state.phase();
        if self.state.mode() == TimerMode::Pomodoro
            && previous.minutes_for(phase) != settings.minutes_for(phase)
        {
            self.state.arm(settings.secs_for(phase));
            debug!("{} phase re-armed at {}s", phase.label(), settings.secs_for(phase));
            self.publish_state();
        }
        Ok(())
    }

    /// Clears the completed focus counter, restarting the long-break cycle.
    pub fn reset_session_count(&mut self) {
        self.state.reset_focus_count();
        self.publish_state();
    }

    /// Advances the timer by one second.
    /// Returns (state_changed, optional_completion_event).
    pub fn tick(&mut self) -> (bool, Option<CompletionEvent>) {
        if !self.state.is_running() {
            return (false, None);
        }

        let completion = match self.state.mode() {
            TimerMode::Stopwatch => {
                self.state.count_up();
                None
            }
            _ if self.state.display_secs() > 0 => {
                self.state.count_down();
                None
            }
            _ => Some(self.complete()),
        };

        if let Some(event) = completion {
            self.publish(TimerEvent::Completed(event));
        }
        self.publish_state();
        (true, completion)
    }

    /// Ticks only if `epoch` is still current. Returns whether the ticker should keep going.
    pub fn tick_for(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            debug!("Dropping stale tick from epoch {}", epoch);
            return false;
        }
        self.tick();
        self.state.is_running()
    }

    fn complete(&mut self) -> CompletionEvent {
        if self.state.mode() != TimerMode::Pomodoro {
            self.state.set_running(false);
            info!("Timer finished");
            return CompletionEvent::TimerComplete;
        }

        let settings = self.settings.current();
        let event = match self.state.phase() {
            PomodoroPhase::Focus => {
                let count = self.state.increment_focus_count();
                self.stats.record_session(settings.focus_mins);

                let is_long_break = count % FOCUS_SESSIONS_PER_CYCLE == 0;
                let next = if is_long_break {
                    PomodoroPhase::LongBreak
                } else {
                    PomodoroPhase::ShortBreak
                };
                self.state.set_phase(next);
                CompletionEvent::PomodoroComplete {
                    count,
                    is_long_break,
                }
            }
            phase => {
                self.state.set_phase(PomodoroPhase::Focus);
                CompletionEvent::BreakComplete {
                    was_long_break: phase == PomodoroPhase::LongBreak,
                }
            }
        };

        // The next phase starts right away; running stays set.
        self.state.arm(settings.secs_for(self.state.phase()));
        info!("{:?}, now in {} phase", event, self.state.phase().label());
        event
    }

    fn default_secs(&self) -> u32 {
        match self.state.mode() {
            TimerMode::Pomodoro => self.settings.current().secs_for(self.state.phase()),
            TimerMode::Timer => DEFAULT_TIMER_SECS,
            TimerMode::Stopwatch => 0,
        }
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn publish_state(&mut self) {
        self.publish(TimerEvent::StateChanged(self.state.clone()));
    }

    fn publish(&mut self, event: TimerEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
