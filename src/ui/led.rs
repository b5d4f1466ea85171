//! Single-colour status LED: blink patterns and short activity flashes.

/// Blink half-period while booting or serving the provisioning portal.
pub const FAST_BLINK_MS: u64 = 100;
/// Blink half-period while associating with a network.
pub const SLOW_BLINK_MS: u64 = 500;
/// Activity flash on each door sample.
pub const SAMPLE_FLASH_MS: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Steady(bool),
    Blink(u64),
}

#[derive(Debug, Clone)]
pub struct StatusLed {
    mode: LedMode,
    on: bool,
    next_toggle_ms: u64,
    flash_until: Option<u64>,
    dirty: bool,
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLed {
    pub const fn new() -> Self {
        Self {
            mode: LedMode::Steady(false),
            on: false,
            next_toggle_ms: 0,
            flash_until: None,
            dirty: true,
        }
    }

    pub fn mode(&self) -> LedMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LedMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.next_toggle_ms = 0;
        if let LedMode::Steady(on) = mode {
            self.on = on;
            self.dirty = true;
        }
    }

    /// Light the LED for `ms`, then drop back to the current mode.
    pub fn flash(&mut self, now_ms: u64, ms: u64) {
        self.flash_until = Some(now_ms + ms);
        self.on = true;
        self.dirty = true;
    }

    /// Advance time.  Returns the new level when the output must change.
    pub fn poll(&mut self, now_ms: u64) -> Option<bool> {
        if let Some(until) = self.flash_until {
            if now_ms < until {
                return self.take_dirty();
            }
            self.flash_until = None;
            self.on = matches!(self.mode, LedMode::Steady(true));
            self.dirty = true;
        }

        if let LedMode::Blink(period) = self.mode {
            if now_ms >= self.next_toggle_ms {
                self.on = !self.on;
                self.next_toggle_ms = now_ms + period;
                self.dirty = true;
            }
        }
        self.take_dirty()
    }

    fn take_dirty(&mut self) -> Option<bool> {
        if self.dirty {
            self.dirty = false;
            Some(self.on)
        } else {
            None
        }
    }
}
