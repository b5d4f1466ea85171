//! In-memory ring buffer implementing [`EventLogPort`].
//!
//! Storage is a fixed `heapless::Deque` sized for the largest allowed
//! log (`lsz` max); the live capacity follows the `lsz` option and the
//! oldest record is overwritten once it is reached.  Reads go oldest
//! first.

use log::info;

use crate::app::ports::{EventLogPort, LogError};
use crate::door::LogEntry;

/// Largest log the option table allows.
pub const MAX_LOG_ENTRIES: usize = 400;
/// Smallest log the option table allows.
pub const MIN_LOG_ENTRIES: usize = 20;

pub struct RingLog {
    entries: heapless::Deque<LogEntry, MAX_LOG_ENTRIES>,
    capacity: usize,
    cursor: usize,
}

impl RingLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: heapless::Deque::new(),
            capacity: capacity.clamp(MIN_LOG_ENTRIES, MAX_LOG_ENTRIES),
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Follow a changed `lsz`; shrinking drops the oldest records.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.clamp(MIN_LOG_ENTRIES, MAX_LOG_ENTRIES);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.cursor.min(self.entries.len());
    }
}

impl EventLogPort for RingLog {
    fn append(&mut self, entry: &LogEntry) -> Result<(), LogError> {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(*entry).map_err(|_| LogError::IoError)
    }

    fn read_from_start(&mut self) {
        self.cursor = 0;
    }

    fn read_next(&mut self) -> Option<LogEntry> {
        let entry = self.entries.iter().nth(self.cursor).copied()?;
        self.cursor += 1;
        Some(entry)
    }

    fn reset(&mut self) -> Result<(), LogError> {
        self.entries.clear();
        self.cursor = 0;
        info!("RingLog: cleared");
        Ok(())
    }
}
