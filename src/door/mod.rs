//! Door sensing: raw sample interpretation, debounce classification and
//! vehicle presence.
//!
//! ```text
//!  SensorPort ──▶ reading ──▶ debounce ──▶ DoorEvent
//!                    │
//!                    └──────▶ vehicle ───▶ VehiclePresence
//! ```

pub mod debounce;
pub mod reading;
pub mod vehicle;

use serde::{Deserialize, Serialize};

pub use debounce::DoorHistory;
pub use reading::{DoorReading, SampleFilter};
pub use vehicle::VehiclePresence;

/// Classification of the debounce window after one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorEvent {
    RemainClosed,
    RemainOpen,
    JustOpened,
    JustClosed,
    /// The window changed more than once: no new information.
    Mixed,
}

impl DoorEvent {
    /// `JustOpened` or `JustClosed`.
    pub fn is_transition(self) -> bool {
        matches!(self, Self::JustOpened | Self::JustClosed)
    }

    /// Numeric code used on the wire (`0..=4`).
    pub fn code(self) -> u8 {
        match self {
            Self::RemainClosed => 0,
            Self::RemainOpen => 1,
            Self::JustOpened => 2,
            Self::JustClosed => 3,
            Self::Mixed => 4,
        }
    }
}

/// One door log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// UTC seconds.  `0` marks an empty slot in fixed-size stores.
    pub tstamp: u64,
    /// Door open after the transition.
    pub open: bool,
    /// Distance reading (cm) at the time of the transition.
    pub distance: u32,
}

impl LogEntry {
    /// `[tstamp, status, dist]` as reported in the log view.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!([self.tstamp, u8::from(self.open), self.distance])
    }
}
