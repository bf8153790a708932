//! Background tick source driving the engine once per period.

use crate::engine::TimerEngine;
use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A running tick thread and the means to stop it.
struct TickHandle {
    epoch: u64,
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Owns at most one tick thread at a time.
pub struct Ticker {
    period: Duration,
    handle: Option<TickHandle>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    /// Epoch of the armed tick thread, if any.
    pub fn armed_epoch(&self) -> Option<u64> {
        self.handle.as_ref().map(|h| h.epoch)
    }

    /// Starts ticking `engine` under `epoch`, tearing down any previous thread first.
    ///
    /// Must not be called while holding the engine lock.
    pub fn arm(&mut self, engine: Arc<Mutex<TimerEngine>>, epoch: u64) {
        self.cancel();

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let period = self.period;
        let spawned = thread::Builder::new()
            .name("focusnook-ticker".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Explicit stop or the handle was dropped.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let keep_going = engine
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .tick_for(epoch);
                if !keep_going {
                    debug!("Ticker for epoch {} finished", epoch);
                    break;
                }
            });

        match spawned {
            Ok(thread) => {
                debug!("Armed ticker for epoch {}", epoch);
                self.handle = Some(TickHandle {
                    epoch,
                    stop_tx,
                    thread,
                });
            }
            Err(e) => warn!("Could not spawn ticker thread: {}", e),
        }
    }

    /// Stops the tick thread and waits for it to exit.
    ///
    /// Must not be called while holding the engine lock.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            // The thread may already have exited on its own.
            let _ = handle.stop_tx.send(());
            if handle.thread.join().is_err() {
                warn!("Ticker thread for epoch {} panicked", handle.epoch);
            }
            debug!("Cancelled ticker for epoch {}", handle.epoch);
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn shared_engine() -> Arc<Mutex<TimerEngine>> {
        let store = Store::open_in_memory().unwrap();
        Arc::new(Mutex::new(TimerEngine::new(store)))
    }

    #[test]
    fn test_ticks_running_engine() {
        let engine = shared_engine();
        let epoch = {
            let mut guard = engine.lock().unwrap();
            guard.start();
            guard.epoch()
        };

        let mut ticker = Ticker::new(Duration::from_millis(5));
        ticker.arm(Arc::clone(&engine), epoch);
        assert_eq!(ticker.armed_epoch(), Some(epoch));
        thread::sleep(Duration::from_millis(100));
        ticker.cancel();
        assert_eq!(ticker.armed_epoch(), None);

        let remaining = engine.lock().unwrap().state().remaining_secs().unwrap();
        assert!(remaining < 25 * 60);

        // Nothing moves once cancelled.
        thread::sleep(Duration::from_millis(30));
        assert_eq!(
            engine.lock().unwrap().state().remaining_secs(),
            Some(remaining)
        );
    }

    #[test]
    fn test_stale_epoch_thread_exits_without_ticking() {
        let engine = shared_engine();
        let stale = {
            let mut guard = engine.lock().unwrap();
            guard.start();
            let stale = guard.epoch();
            guard.pause();
            guard.start();
            stale
        };

        let mut ticker = Ticker::new(Duration::from_millis(5));
        ticker.arm(Arc::clone(&engine), stale);
        thread::sleep(Duration::from_millis(50));

        assert_eq!(
            engine.lock().unwrap().state().remaining_secs(),
            Some(25 * 60)
        );
        ticker.cancel();
    }

    #[test]
    fn test_rearm_replaces_previous_thread() {
        let engine = shared_engine();
        let epoch = {
            let mut guard = engine.lock().unwrap();
            guard.start();
            guard.epoch()
        };

        let mut ticker = Ticker::new(Duration::from_secs(60));
        ticker.arm(Arc::clone(&engine), epoch);
        ticker.arm(Arc::clone(&engine), epoch);
        assert_eq!(ticker.armed_epoch(), Some(epoch));
        // Cancelling a long-period ticker returns promptly.
        ticker.cancel();
    }
}
