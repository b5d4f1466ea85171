//! Hardware adapter: bridges the board's peripherals to the domain's
//! [`SensorPort`] and [`ActuatorPort`].
//!
//! Pins arrive as `embedded-hal` drivers; the ranger, climate sensor and
//! buzzer sit behind small traits so the board can be assembled with
//! whatever parts are fitted.  On non-espidf targets the buzzer and
//! climate sensor fall back to no-op implementations.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::hw_init;
use crate::drivers::inputs::{Button, DoorSwitch};
use crate::drivers::relay::Relay;
use crate::drivers::status_led::StatusLedPin;
use crate::drivers::ultrasonic::Ultrasonic;

// ── Part traits ───────────────────────────────────────────────

/// Distance sensor in centimetres.
pub trait RangeFinder {
    fn read_cm(&mut self) -> Option<u32>;
}

impl<T: OutputPin, E: InputPin, D: DelayNs> RangeFinder for Ultrasonic<T, E, D> {
    fn read_cm(&mut self) -> Option<u32> {
        Ultrasonic::read_cm(self)
    }
}

/// Temperature (°C) and relative humidity (%).
pub trait ClimateSensor {
    fn read(&mut self) -> Option<(f32, f32)>;
}

/// No sensor fitted.
pub struct NoClimateSensor;

impl ClimateSensor for NoClimateSensor {
    fn read(&mut self) -> Option<(f32, f32)> {
        None
    }
}

pub trait Buzzer {
    /// `0` silences.
    fn tone(&mut self, hz: u32);
}

/// Piezo on the LEDC channel configured by [`hw_init`].
pub struct LedcBuzzer;

impl Buzzer for LedcBuzzer {
    fn tone(&mut self, hz: u32) {
        hw_init::buzzer_tone(hz);
    }
}

// ── Adapter ───────────────────────────────────────────────────

pub struct HardwareAdapter<R: OutputPin, L: OutputPin, B: InputPin, S: InputPin> {
    relay: Relay<R>,
    led: StatusLedPin<L>,
    button: Button<B>,
    door_switch: DoorSwitch<S>,
    ranger: Box<dyn RangeFinder>,
    climate: Box<dyn ClimateSensor>,
    buzzer: Box<dyn Buzzer>,
}

impl<R: OutputPin, L: OutputPin, B: InputPin, S: InputPin> HardwareAdapter<R, L, B, S> {
    pub fn new(
        relay: Relay<R>,
        led: StatusLedPin<L>,
        button: Button<B>,
        door_switch: DoorSwitch<S>,
        ranger: Box<dyn RangeFinder>,
        climate: Box<dyn ClimateSensor>,
        buzzer: Box<dyn Buzzer>,
    ) -> Self {
        Self {
            relay,
            led,
            button,
            door_switch,
            ranger,
            climate,
            buzzer,
        }
    }

    pub fn relay_closed(&self) -> bool {
        self.relay.is_closed()
    }

    pub fn led_on(&self) -> bool {
        self.led.is_on()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<R: OutputPin, L: OutputPin, B: InputPin, S: InputPin> SensorPort for HardwareAdapter<R, L, B, S> {
    fn read_distance(&mut self) -> Option<u32> {
        self.ranger.read_cm()
    }

    fn read_switch(&mut self) -> Option<bool> {
        self.door_switch.read()
    }

    fn read_temperature_humidity(&mut self) -> Option<(f32, f32)> {
        self.climate.read()
    }

    fn button_pressed(&mut self) -> bool {
        self.button.is_pressed()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<R: OutputPin, L: OutputPin, B: InputPin, S: InputPin> ActuatorPort for HardwareAdapter<R, L, B, S> {
    fn click_relay(&mut self, pulse_ms: u32, now_ms: u64) {
        self.relay.click(pulse_ms, now_ms);
    }

    fn set_tone(&mut self, hz: u32) {
        self.buzzer.tone(hz);
    }

    fn set_led(&mut self, on: bool) {
        self.led.set(on);
    }

    fn poll_outputs(&mut self, now_ms: u64) {
        self.relay.poll(now_ms);
    }
}
