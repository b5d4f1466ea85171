//! Opener relay driver.
//!
//! A "click" closes the relay for a fixed pulse, the same as pressing the
//! wall button.  The pulse is non-blocking: [`Relay::click`] raises the
//! pin and records a release deadline, and [`Relay::poll`] (called every
//! loop pass) drops it again once the deadline has passed.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct Relay<P: OutputPin> {
    pin: P,
    release_at_ms: Option<u64>,
}

impl<P: OutputPin> Relay<P> {
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("Relay: initial release failed");
        }
        Self {
            pin,
            release_at_ms: None,
        }
    }

    /// Close the relay for `pulse_ms`.  A click during a running pulse
    /// extends it instead of stacking.
    pub fn click(&mut self, pulse_ms: u32, now_ms: u64) {
        if self.pin.set_high().is_err() {
            warn!("Relay: set_high failed");
            return;
        }
        self.release_at_ms = Some(now_ms + u64::from(pulse_ms));
    }

    pub fn poll(&mut self, now_ms: u64) {
        match self.release_at_ms {
            Some(at) if now_ms >= at => {
                if self.pin.set_low().is_err() {
                    warn!("Relay: set_low failed, retrying next pass");
                    return;
                }
                self.release_at_ms = None;
            }
            _ => {}
        }
    }

    pub fn is_closed(&self) -> bool {
        self.release_at_ms.is_some()
    }
}
