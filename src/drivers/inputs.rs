//! Digital inputs: the front-panel button and the magnetic door switch.

use embedded_hal::digital::InputPin;

/// Active-low push button with external pull-up.
pub struct Button<P: InputPin> {
    pin: P,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// A failed read counts as "not pressed".
    pub fn is_pressed(&mut self) -> bool {
        self.pin.is_low().unwrap_or(false)
    }
}

/// Magnetic door switch.  Returns the raw level; the door pipeline maps
/// it to open / closed according to the mount type.
pub struct DoorSwitch<P: InputPin> {
    pin: P,
}

impl<P: InputPin> DoorSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn read(&mut self) -> Option<bool> {
        self.pin.is_high().ok()
    }
}
