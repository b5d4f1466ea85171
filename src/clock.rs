//! Software UTC clock.
//!
//! Holds a best-effort estimate of wall-clock UTC seconds.  The estimate
//! is set from an external [`TimeSourcePort`] and advanced between syncs
//! by whole seconds of monotonic time.  Nothing here blocks: a failed
//! sync just schedules another attempt.
//!
//! `now()` never goes backwards.  A resync that lands behind the running
//! estimate keeps the estimate.

use log::{debug, info};

use crate::app::ports::TimeSourcePort;

/// 2001-01-01T00:00:00Z.  Anything earlier is a failed query.
pub const SANE_EPOCH: u64 = 978_307_200;

/// Retry delay after a failed query.
pub const SYNC_RETRY_SECS: u64 = 2;

/// Default interval between successful resyncs.
pub const DEFAULT_RESYNC_SECS: u64 = 3600;

const MS_PER_SEC: u64 = 1000;

#[derive(Debug, Clone)]
pub struct SoftwareClock {
    /// Current estimate; `0` until the first successful sync.
    utc_seconds: u64,
    /// Software-clock time of the next resync attempt.
    resync_deadline: u64,
    /// Monotonic ms up to which `utc_seconds` has been advanced.
    tick_anchor: u64,
    /// Monotonic ms of the next attempt while never synced.
    retry_at_ms: u64,
    resync_interval: u64,
}

impl Default for SoftwareClock {
    fn default() -> Self {
        Self::new(DEFAULT_RESYNC_SECS)
    }
}

impl SoftwareClock {
    pub const fn new(resync_interval: u64) -> Self {
        Self {
            utc_seconds: 0,
            resync_deadline: 0,
            tick_anchor: 0,
            retry_at_ms: 0,
            resync_interval,
        }
    }

    /// Advance the estimate to `mono_ms` and resync if due.
    pub fn now(&mut self, mono_ms: u64, source: &mut impl TimeSourcePort) -> u64 {
        if self.utc_seconds == 0 {
            if mono_ms >= self.retry_at_ms {
                self.sync(mono_ms, source);
            }
            return self.utc_seconds;
        }

        self.catch_up(mono_ms);
        if self.utc_seconds > self.resync_deadline {
            self.sync(mono_ms, source);
        }
        self.utc_seconds
    }

    /// Last computed estimate, without advancing.
    pub fn utc_seconds(&self) -> u64 {
        self.utc_seconds
    }

    /// UTC hour of day (0–23).
    pub fn hour(&self) -> u32 {
        ((self.utc_seconds % 86_400) / 3_600) as u32
    }

    pub fn is_synced(&self) -> bool {
        self.utc_seconds != 0
    }

    fn catch_up(&mut self, mono_ms: u64) {
        let elapsed = mono_ms.saturating_sub(self.tick_anchor);
        let whole = elapsed / MS_PER_SEC;
        if whole > 0 {
            self.utc_seconds += whole;
            self.tick_anchor += whole * MS_PER_SEC;
        }
    }

    fn sync(&mut self, mono_ms: u64, source: &mut impl TimeSourcePort) {
        let queried = source.utc_now();
        if queried < SANE_EPOCH {
            debug!("Time sync failed (got {}), retrying in {}s", queried, SYNC_RETRY_SECS);
            if self.utc_seconds == 0 {
                self.retry_at_ms = mono_ms + SYNC_RETRY_SECS * MS_PER_SEC;
            } else {
                self.resync_deadline = self.utc_seconds + SYNC_RETRY_SECS;
            }
            return;
        }

        self.utc_seconds = queried.max(self.utc_seconds);
        self.tick_anchor = mono_ms;
        self.resync_deadline = self.utc_seconds + self.resync_interval;
        info!("Time synced: utc={} hour={}", self.utc_seconds, self.hour());
    }
}
