//! Shift-register debounce of the door open/closed signal.
//!
//! Each sample shifts one bit into bit 0 of an 8-bit history (`1` = open).
//! Only the low [`WINDOW`] bits are classified; older bits fall off the
//! top.  A single-sample glitch shows up as [`DoorEvent::Mixed`] and is
//! ignored by everything downstream.  A real transition is reported
//! [`WINDOW`]/2 samples after the door moves:
//!
//! ```text
//!   window (oldest … newest)   event
//!   0 0 0 0                    RemainClosed
//!   0 0 1 1                    JustOpened
//!   1 1 1 1                    RemainOpen
//!   1 1 0 0                    JustClosed
//!   anything else              Mixed
//! ```

use super::DoorEvent;

/// Number of samples in the classification window.
pub const WINDOW: u32 = 4;

const WINDOW_MASK: u8 = (1 << WINDOW) - 1;
const MASK_REMAIN_CLOSED: u8 = 0b0000;
const MASK_REMAIN_OPEN: u8 = 0b1111;
const MASK_JUST_OPENED: u8 = 0b0011;
const MASK_JUST_CLOSED: u8 = 0b1100;

/// Door status history.  Owned by the pipeline; nothing else writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoorHistory {
    bits: u8,
    primed: bool,
}

impl DoorHistory {
    pub const fn new() -> Self {
        Self {
            bits: 0,
            primed: false,
        }
    }

    /// Shift in one sample and classify the window.
    ///
    /// The very first sample fills the whole register with its value, so
    /// the first event is always `RemainClosed` or `RemainOpen`.
    pub fn sample(&mut self, open: bool) -> DoorEvent {
        if self.primed {
            self.bits = (self.bits << 1) | u8::from(open);
        } else {
            self.bits = if open { 0xFF } else { 0x00 };
            self.primed = true;
        }
        classify(self.bits)
    }

    /// Raw register contents, newest sample in bit 0.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Whether at least one sample has been taken.
    pub fn is_primed(&self) -> bool {
        self.primed
    }
}

/// Classify any 8-bit history.  Bits above the window are ignored.
pub fn classify(bits: u8) -> DoorEvent {
    match bits & WINDOW_MASK {
        MASK_REMAIN_CLOSED => DoorEvent::RemainClosed,
        MASK_REMAIN_OPEN => DoorEvent::RemainOpen,
        MASK_JUST_OPENED => DoorEvent::JustOpened,
        MASK_JUST_CLOSED => DoorEvent::JustClosed,
        _ => DoorEvent::Mixed,
    }
}
