//! Front-panel button hold classification.
//!
//! The button level is polled once per loop pass (no ISR).  The action is
//! chosen on release from how long the button was held:
//!
//! | Held for                  | Event          |
//! |---------------------------|----------------|
//! | > 50 ms                   | `Click`        |
//! | > 800 ms                  | `ReportIp`     |
//! | > 5 s                     | `ResetToAp`    |
//! | > 10 s                    | `FactoryReset` |
//!
//! While held past the reset thresholds the LED gives feedback: solid on
//! past 5 s, off past 10 s.

const CLICK_MS: u64 = 50;
pub const REPORT_IP_MS: u64 = 800;
pub const AP_RESET_MS: u64 = 5_000;
pub const FACTORY_RESET_MS: u64 = 10_000;

/// Classified release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Click,
    ReportIp,
    ResetToAp,
    FactoryReset,
}

/// Output of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSignal {
    /// Still held past a reset threshold; drive the LED to `led_on`.
    Holding { led_on: bool },
    Released(ButtonEvent),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonTracker {
    down_since: Option<u64>,
}

impl ButtonTracker {
    pub const fn new() -> Self {
        Self { down_since: None }
    }

    pub fn is_held(&self) -> bool {
        self.down_since.is_some()
    }

    /// Feed the current level.  `pressed` is the logical state (the
    /// adapter hides the active-low wiring).
    pub fn poll(&mut self, pressed: bool, now_ms: u64) -> Option<ButtonSignal> {
        match (pressed, self.down_since) {
            (true, None) => {
                self.down_since = Some(now_ms);
                None
            }
            (true, Some(since)) => {
                let held = now_ms.saturating_sub(since);
                if held > FACTORY_RESET_MS {
                    Some(ButtonSignal::Holding { led_on: false })
                } else if held > AP_RESET_MS {
                    Some(ButtonSignal::Holding { led_on: true })
                } else {
                    None
                }
            }
            (false, Some(since)) => {
                self.down_since = None;
                classify_hold(now_ms.saturating_sub(since)).map(ButtonSignal::Released)
            }
            (false, None) => None,
        }
    }
}

/// Map a hold duration to its release event.  Very short blips are
/// dropped.
pub fn classify_hold(held_ms: u64) -> Option<ButtonEvent> {
    if held_ms > FACTORY_RESET_MS {
        Some(ButtonEvent::FactoryReset)
    } else if held_ms > AP_RESET_MS {
        Some(ButtonEvent::ResetToAp)
    } else if held_ms > REPORT_IP_MS {
        Some(ButtonEvent::ReportIp)
    } else if held_ms > CLICK_MS {
        Some(ButtonEvent::Click)
    } else {
        None
    }
}
