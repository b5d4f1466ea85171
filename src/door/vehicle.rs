//! Vehicle presence below a ceiling-mounted sensor.

use serde::{Deserialize, Serialize};

use crate::config::MountType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehiclePresence {
    No,
    Yes,
    /// Door is open; the sensor sees the door, not the car.
    Unknown,
    /// Mount type or configuration cannot measure presence.
    Disabled,
}

impl VehiclePresence {
    /// Numeric code used in the status view.
    pub fn code(self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
            Self::Unknown => 2,
            Self::Disabled => 3,
        }
    }
}

/// Thresholds in centimetres.  `vehicle == 0` disables detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleThresholds {
    pub door: u32,
    pub vehicle: u32,
}

pub fn classify(
    mount: MountType,
    thresholds: VehicleThresholds,
    distance: u32,
    door_open: bool,
) -> VehiclePresence {
    if mount != MountType::Ceiling || thresholds.vehicle == 0 {
        return VehiclePresence::Disabled;
    }
    if door_open {
        return VehiclePresence::Unknown;
    }
    if distance > thresholds.door && distance <= thresholds.vehicle {
        VehiclePresence::Yes
    } else {
        VehiclePresence::No
    }
}
