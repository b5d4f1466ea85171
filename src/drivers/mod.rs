//! Pin-level drivers and one-shot peripheral set-up.
//!
//! Drivers are generic over the `embedded-hal` 1.0 traits; on the device
//! `main()` hands them `esp-idf-hal` pin drivers.

pub mod hw_init;
pub mod inputs;
pub mod relay;
pub mod status_led;
pub mod ultrasonic;
pub mod watchdog;
