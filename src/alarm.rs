//! Pre-actuation alarm countdown and the relay actuation policy.
//!
//! The countdown ticks on every half-second boundary of monotonic time:
//! tone on even half-seconds, off on odd ones.  When it reaches zero the
//! tone is silenced and the relay fires, once.

use log::info;

/// Buzzer frequency while the alarm sounds.
pub const ALARM_TONE_HZ: u32 = 1000;

/// Alarm length used by automation closes when the alarm option is off.
pub const AUTOMATION_ALARM_SECS: u32 = 5;

const HALF_SECOND_MS: u64 = 500;

/// Half-second ticks for an alarm of `secs` seconds.
pub const fn alarm_ticks(secs: u32) -> u32 {
    secs * 2 + 1
}

/// What the alarm wants from the outputs on this half-second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmStep {
    Tone(u32),
    Silence,
    /// Countdown finished: silence the tone and click the relay.
    Fire,
}

#[derive(Debug, Clone, Default)]
pub struct AlarmCountdown {
    remaining_ticks: u32,
    last_half_second: Option<u64>,
}

impl AlarmCountdown {
    pub const fn new() -> Self {
        Self {
            remaining_ticks: 0,
            last_half_second: None,
        }
    }

    /// Start (or restart) the countdown.  Replaces any countdown in
    /// progress.
    pub fn arm(&mut self, ticks: u32) {
        info!("Alarm armed for {} half-seconds", ticks);
        self.remaining_ticks = ticks;
    }

    pub fn is_armed(&self) -> bool {
        self.remaining_ticks > 0
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    /// Call every loop pass.  Steps at most once per half-second boundary.
    pub fn poll(&mut self, now_ms: u64) -> Option<AlarmStep> {
        if !self.is_armed() {
            return None;
        }
        let half = now_ms / HALF_SECOND_MS;
        if self.last_half_second == Some(half) {
            return None;
        }
        self.last_half_second = Some(half);
        self.tick_half_second(half)
    }

    /// One half-second step with boundary index `half`.
    pub fn tick_half_second(&mut self, half: u64) -> Option<AlarmStep> {
        if !self.is_armed() {
            return None;
        }
        self.remaining_ticks -= 1;
        if self.remaining_ticks == 0 {
            return Some(AlarmStep::Fire);
        }
        if half % 2 == 0 {
            Some(AlarmStep::Tone(ALARM_TONE_HZ))
        } else {
            Some(AlarmStep::Silence)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Actuation policy
// ───────────────────────────────────────────────────────────────

/// How a door movement should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    ClickNow,
    /// Arm the alarm for this many half-second ticks.
    Alarm(u32),
}

/// Policy for user-requested door movements.
///
/// `alarm_secs == 0` means the alarm feature is off.  With
/// `no_alarm_on_open` set, opening a closed door skips the alarm.
pub fn manual_actuation(alarm_secs: u32, no_alarm_on_open: bool, door_open: bool) -> Actuation {
    if alarm_secs == 0 || (no_alarm_on_open && !door_open) {
        Actuation::ClickNow
    } else {
        Actuation::Alarm(alarm_ticks(alarm_secs))
    }
}

/// Policy for automation-initiated closes: always alarmed.
pub fn automation_actuation(alarm_secs: u32) -> Actuation {
    let secs = if alarm_secs == 0 {
        AUTOMATION_ALARM_SECS
    } else {
        alarm_secs
    };
    Actuation::Alarm(alarm_ticks(secs))
}
