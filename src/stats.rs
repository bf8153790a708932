//! Completed-session statistics with daily rollover.

use crate::models::StatsSnapshot;
use crate::store::{keys, Store};
use chrono::{Local, NaiveDate};
use log::{debug, info, warn};

/// Source of "today" for rollover checks.
pub type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct StatsAggregator {
    store: Store,
    snapshot: StatsSnapshot,
    clock: Clock,
}

impl StatsAggregator {
    /// Loads stats using the local calendar date.
    pub fn load(store: Store) -> Self {
        Self::load_with_clock(store, Box::new(local_today))
    }

    /// Loads stats with a custom date source, then applies any pending rollover.
    pub fn load_with_clock(store: Store, clock: Clock) -> Self {
        let today = clock();
        let mut snapshot = store.get(keys::STATS, StatsSnapshot::new(today));

        let repaired = !snapshot.is_consistent();
        if repaired {
            warn!(
                "Stored stats have daily above total ({:?} vs {:?}), lifting totals",
                snapshot.daily, snapshot.total
            );
            snapshot.total.sessions = snapshot.total.sessions.max(snapshot.daily.sessions);
            snapshot.total.minutes = snapshot.total.minutes.max(snapshot.daily.minutes);
        }

        let mut stats = Self {
            store,
            snapshot,
            clock,
        };
        if !stats.rollover_if_needed(today) && repaired {
            stats.persist();
        }
        stats
    }

    /// Resets today's bucket when `today` differs from the stored date.
    /// Returns true if a rollover happened.
    pub fn rollover_if_needed(&mut self, today: NaiveDate) -> bool {
        if self.snapshot.daily.last_date == today {
            return false;
        }

        info!(
            "Day rollover {} -> {}, resetting daily stats",
            self.snapshot.daily.last_date, today
        );
        self.snapshot.daily.sessions = 0;
        self.snapshot.daily.minutes = 0;
        self.snapshot.daily.last_date = today;
        self.persist();
        true
    }

    /// Records one completed focus session of `minutes` in both buckets.
    pub fn record_session(&mut self, minutes: u32) {
        if minutes == 0 {
            warn!("Ignoring zero-minute session");
            return;
        }

        let today = (self.clock)();
        self.rollover_if_needed(today);

        let daily = &mut self.snapshot.daily;
        daily.sessions = daily.sessions.saturating_add(1);
        daily.minutes = daily.minutes.saturating_add(minutes);
        let total = &mut self.snapshot.total;
        total.sessions = total.sessions.saturating_add(1);
        total.minutes = total.minutes.saturating_add(minutes);
        debug_assert!(self.snapshot.is_consistent());

        debug!(
            "Recorded {} minute session (today: {}, total: {})",
            minutes, self.snapshot.daily.sessions, self.snapshot.total.sessions
        );
        self.persist();
    }

    /// Returns the current stats after checking for a day change.
    pub fn snapshot(&mut self) -> StatsSnapshot {
        let today = (self.clock)();
        self.rollover_if_needed(today);
        self.snapshot.clone()
    }

    fn persist(&self) {
        if let Err(e) = self.store.set(keys::STATS, &self.snapshot) {
            warn!("Stats kept in memory only: {}", e);
        }
    }
}
