//! HC-SR04 style ultrasonic ranger.
//!
//! A 10 µs trigger pulse starts a measurement; the echo pin then stays
//! high for the round-trip time of the sound.  The wait is bounded by
//! [`ECHO_TIMEOUT_US`] so a missing echo costs at most ~26 ms.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Longest echo we wait for (about 4.5 m).
pub const ECHO_TIMEOUT_US: u64 = 26_000;

/// Round-trip microseconds per centimetre.
const US_PER_CM: u64 = 58;

pub struct Ultrasonic<T, E, D> {
    trig: T,
    echo: E,
    delay: D,
    micros: fn() -> u64,
}

impl<T, E, D> Ultrasonic<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    /// `micros` is the free-running microsecond timebase.
    pub fn new(trig: T, echo: E, delay: D, micros: fn() -> u64) -> Self {
        Self {
            trig,
            echo,
            delay,
            micros,
        }
    }

    /// One measurement in centimetres, `None` on timeout or pin error.
    pub fn read_cm(&mut self) -> Option<u32> {
        self.trig.set_low().ok()?;
        self.delay.delay_us(2);
        self.trig.set_high().ok()?;
        self.delay.delay_us(10);
        self.trig.set_low().ok()?;

        let start = (self.micros)();
        while !self.echo.is_high().ok()? {
            if (self.micros)() - start > ECHO_TIMEOUT_US {
                return None;
            }
        }
        let rise = (self.micros)();
        while self.echo.is_high().ok()? {
            if (self.micros)() - rise > ECHO_TIMEOUT_US {
                return None;
            }
        }
        let width = (self.micros)() - rise;
        Some((width / US_PER_CM) as u32)
    }
}
