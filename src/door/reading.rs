//! Raw sensor sample → door open/closed plus distance, per mount type.

use crate::config::MountType;

/// Switch mounts report a synthetic distance this far from the threshold.
const SWITCH_DISTANCE_OFFSET: u32 = 20;

/// One interpreted door sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorReading {
    pub open: bool,
    /// Centimetres.  Synthesised for switch mounts.
    pub distance: u32,
}

/// What the sensor driver returned this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSample {
    Distance(u32),
    /// `true` = HIGH.
    Switch(bool),
}

/// Convert a raw sample for `mount` against the door threshold.
///
/// A sample of the wrong kind for the mount yields `None`.
pub fn interpret(mount: MountType, door_threshold: u32, raw: RawSample) -> Option<DoorReading> {
    let near = door_threshold.saturating_sub(SWITCH_DISTANCE_OFFSET);
    let far = door_threshold.saturating_add(SWITCH_DISTANCE_OFFSET);
    let reading = match (mount, raw) {
        (MountType::Ceiling, RawSample::Distance(d)) => DoorReading {
            open: d <= door_threshold,
            distance: d,
        },
        (MountType::Side, RawSample::Distance(d)) => DoorReading {
            open: d > door_threshold,
            distance: d,
        },
        (MountType::SwitchLow, RawSample::Switch(high)) => DoorReading {
            open: high,
            distance: if high { near } else { far },
        },
        (MountType::SwitchHigh, RawSample::Switch(high)) => DoorReading {
            open: !high,
            distance: if high { far } else { near },
        },
        _ => return None,
    };
    Some(reading)
}

/// Holds the last valid reading so a failed sensor read repeats it
/// instead of injecting a bit into the debounce history.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleFilter {
    last: Option<DoorReading>,
}

impl SampleFilter {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Feed one (possibly failed) reading.  Returns the reading to
    /// classify, or `None` if no valid reading has ever been seen.
    pub fn accept(&mut self, reading: Option<DoorReading>) -> Option<DoorReading> {
        if let Some(r) = reading {
            self.last = Some(r);
        }
        self.last
    }

    pub fn last(&self) -> Option<DoorReading> {
        self.last
    }
}
