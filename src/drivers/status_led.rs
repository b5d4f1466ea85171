//! Single-colour status LED.

use embedded_hal::digital::OutputPin;

pub struct StatusLedPin<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> StatusLedPin<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) {
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        if res.is_ok() {
            self.on = on;
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
