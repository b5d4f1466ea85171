//! Always-on front-panel handling: button, status LED, IP tone reporter.

pub mod button;
pub mod ip_report;
pub mod led;

pub use button::{ButtonEvent, ButtonSignal, ButtonTracker};
pub use ip_report::IpReporter;
pub use led::{LedMode, StatusLed};
