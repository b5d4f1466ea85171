//! Garage door controller library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod alarm;
pub mod app;
pub mod automation;
pub mod clock;
pub mod config;
pub mod door;
pub mod error;
pub mod fsm;
pub mod ui;

// Board-facing code; the device implementations are guarded by cfg
// attributes inside, the simulation halves build everywhere.
pub mod adapters;
pub mod drivers;
pub mod pins;
