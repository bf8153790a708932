//! Thread-safe facade pairing the engine with its tick source.

use crate::engine::{TimerEngine, TimerError, TimerEvent};
use crate::models::{PomodoroPhase, PomodoroSettings, StatsSnapshot, TimerMode, TimerState};
use crate::settings::SettingsError;
use crate::store::Store;
use crate::ticker::{Ticker, TICK_PERIOD};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The process-wide timer. Every mutation goes through here, one at a time.
pub struct TimerService {
    engine: Arc<Mutex<TimerEngine>>,
    ticker: Mutex<Ticker>,
}

impl TimerService {
    /// Creates a service with a one-second tick backed by `store`.
    pub fn new(store: Store) -> Self {
        Self::with_engine(TimerEngine::new(store), TICK_PERIOD)
    }

    pub fn with_engine(engine: TimerEngine, tick_period: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            ticker: Mutex::new(Ticker::new(tick_period)),
        }
    }

    /// Runs `op` on the engine, then brings the ticker in line with the result.
    fn with_engine_mut<R>(&self, op: impl FnOnce(&mut TimerEngine) -> R) -> R {
        // Held for the whole call so control operations never interleave.
        let mut ticker = lock(&self.ticker);

        let (result, running, epoch) = {
            let mut engine = lock(&self.engine);
            let result = op(&mut *engine);
            (result, engine.state().is_running(), engine.epoch())
        };

        if ticker.armed_epoch() != Some(epoch) {
            ticker.cancel();
            if running {
                ticker.arm(Arc::clone(&self.engine), epoch);
            }
        } else if !running {
            // A plain timer that finished on its own; reap the exited thread.
            ticker.cancel();
        }
        result
    }

    pub fn state(&self) -> TimerState {
        lock(&self.engine).state().clone()
    }

    pub fn settings(&self) -> PomodoroSettings {
        lock(&self.engine).settings()
    }

    pub fn stats(&self) -> StatsSnapshot {
        lock(&self.engine).stats()
    }

    pub fn subscribe(&self) -> Receiver<TimerEvent> {
        lock(&self.engine).subscribe()
    }

    pub fn start(&self) -> bool {
        self.with_engine_mut(TimerEngine::start)
    }

    pub fn pause(&self) -> bool {
        self.with_engine_mut(TimerEngine::pause)
    }

    pub fn toggle(&self) -> bool {
        self.with_engine_mut(TimerEngine::toggle)
    }

    pub fn reset(&self) {
        self.with_engine_mut(TimerEngine::reset)
    }

    pub fn switch_mode(&self, mode: TimerMode) {
        self.with_engine_mut(|engine| engine.switch_mode(mode))
    }

    pub fn switch_phase(&self, phase: PomodoroPhase) -> bool {
        self.with_engine_mut(|engine| engine.switch_phase(phase))
    }

    pub fn set_custom_duration(
        &self,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Result<(), TimerError> {
        self.with_engine_mut(|engine| engine.set_custom_duration(hours, minutes, seconds))
    }

    pub fn apply_preset(&self, secs: u32) -> Result<(), TimerError> {
        self.with_engine_mut(|engine| engine.apply_preset(secs))
    }

    pub fn save_settings(&self, settings: PomodoroSettings) -> Result<(), SettingsError> {
        self.with_engine_mut(|engine| engine.save_settings(settings))
    }

    pub fn reset_session_count(&self) {
        self.with_engine_mut(TimerEngine::reset_session_count)
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        lock(&self.ticker).cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const FAST_TICK: Duration = Duration::from_millis(5);

    fn create_test_service() -> TimerService {
        let store = Store::open_in_memory().unwrap();
        TimerService::with_engine(TimerEngine::new(store), FAST_TICK)
    }

    #[test]
    fn test_start_drives_countdown() {
        let service = create_test_service();
        assert!(service.start());
        thread::sleep(Duration::from_millis(100));

        let remaining = service.state().remaining_secs().unwrap();
        assert!(remaining < 25 * 60);
        assert!(service.state().is_running());
    }

    #[test]
    fn test_pause_stops_ticking() {
        let service = create_test_service();
        service.start();
        thread::sleep(Duration::from_millis(30));
        assert!(service.pause());

        let frozen = service.state().remaining_secs();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(service.state().remaining_secs(), frozen);
    }

    #[test]
    fn test_switch_mode_while_running_cancels_ticks() {
        let service = create_test_service();
        service.start();
        thread::sleep(Duration::from_millis(30));

        service.switch_mode(TimerMode::Stopwatch);
        let state = service.state();
        assert_eq!(state.elapsed_secs(), Some(0));
        assert!(!state.is_running());

        thread::sleep(Duration::from_millis(50));
        assert_eq!(service.state().elapsed_secs(), Some(0));
    }

    #[test]
    fn test_reset_while_running_cancels_ticks() {
        let service = create_test_service();
        service.start();
        thread::sleep(Duration::from_millis(30));

        service.reset();
        let state = service.state();
        assert_eq!(state.remaining_secs(), Some(25 * 60));
        assert!(!state.is_running());

        thread::sleep(Duration::from_millis(50));
        assert_eq!(service.state().remaining_secs(), Some(25 * 60));
    }

    #[test]
    fn test_switch_phase_while_running_cancels_ticks() {
        let service = create_test_service();
        service.start();
        thread::sleep(Duration::from_millis(30));

        assert!(service.switch_phase(PomodoroPhase::ShortBreak));
        let state = service.state();
        assert_eq!(state.phase(), PomodoroPhase::ShortBreak);
        assert_eq!(state.remaining_secs(), Some(5 * 60));
        assert!(!state.is_running());

        thread::sleep(Duration::from_millis(50));
        assert_eq!(service.state().remaining_secs(), Some(5 * 60));
    }

    #[test]
    fn test_rapid_restarts_keep_single_ticker() {
        let service = create_test_service();
        service.switch_mode(TimerMode::Stopwatch);
        for _ in 0..20 {
            service.start();
            service.pause();
        }
        service.reset();
        let started = std::time::Instant::now();
        service.start();

        // With one live ticker the count can never outpace the wall clock.
        thread::sleep(Duration::from_millis(100));
        service.pause();
        let wall_ms = started.elapsed().as_millis() as u32;
        let elapsed = service.state().elapsed_secs().unwrap();
        assert!(elapsed >= 1);
        assert!(elapsed <= wall_ms / 5 + 1);
    }

    #[test]
    fn test_plain_timer_finishes_in_background() {
        let service = create_test_service();
        service.switch_mode(TimerMode::Timer);
        service.set_custom_duration(0, 0, 2).unwrap();
        let rx = service.subscribe();
        service.start();

        thread::sleep(Duration::from_millis(150));
        let state = service.state();
        assert!(!state.is_running());
        assert_eq!(state.remaining_secs(), Some(0));

        let completions = rx
            .try_iter()
            .filter(|event| matches!(event, TimerEvent::Completed(_)))
            .count();
        assert_eq!(completions, 1);

        // Restarting after a reset works with a fresh ticker.
        service.reset();
        assert!(service.start());
        thread::sleep(Duration::from_millis(30));
        assert!(service.state().remaining_secs().unwrap() < 600);
    }

    #[test]
    fn test_validation_errors_pass_through() {
        let service = create_test_service();
        service.switch_mode(TimerMode::Timer);
        assert_eq!(
            service.set_custom_duration(0, 0, 0),
            Err(TimerError::NonPositiveDuration)
        );
        assert!(service
            .save_settings(PomodoroSettings {
                long_break_mins: 0,
                ..PomodoroSettings::default()
            })
            .is_err());
        assert_eq!(service.settings(), PomodoroSettings::default());
    }

    #[test]
    fn test_settings_and_stats_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusnook.db");

        {
            let service = TimerService::with_engine(
                TimerEngine::new(Store::open(&path).unwrap()),
                Duration::from_millis(1),
            );
            service
                .save_settings(PomodoroSettings {
                    focus_mins: 1,
                    short_break_mins: 1,
                    long_break_mins: 1,
                })
                .unwrap();
            service.start();
            // 61 ticks at 1ms each finish the one-minute focus phase.
            thread::sleep(Duration::from_millis(500));
            service.pause();
            assert!(service.stats().total.sessions >= 1);
        }

        let service = TimerService::new(Store::open(&path).unwrap());
        let state = service.state();
        assert_eq!(service.settings().focus_mins, 1);
        assert_eq!(state.remaining_secs(), Some(60));
        assert!(!state.is_running());
        // Live progress is not persisted.
        assert_eq!(state.completed_focus_count(), 0);
        assert!(service.stats().total.sessions >= 1);
    }
}
