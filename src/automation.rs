//! Door automation and notification rules.
//!
//! Consumes one [`DoorEvent`] per sample plus the software clock and
//! decides what should happen: log the transition, notify, auto-close.
//! Two independent timers live here:
//!
//! - **open duration** (`open_since`): seeded when an episode starts,
//!   fires after `ati` minutes and is then cleared, so the next
//!   `RemainOpen` reseeds it and the reminder recurs every interval.
//! - **hour of day** (`hour_latch`): fires once when the door is open
//!   during the trigger hour; unlocks only once the hour is past the
//!   trigger hour.  With a trigger hour of 23 it never unlocks.

use log::{debug, info};

use crate::config::{AUTO_CLOSE, AUTO_NOTIFY, AutomationConfig, NOTIFY_ON_CLOSE, NOTIFY_ON_OPEN};
use crate::door::{DoorEvent, LogEntry};

/// Something the pipeline must carry out after a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Notify(String),
    /// Close the door.  Always goes through the alarm countdown.
    Close,
    Log(LogEntry),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutomationState {
    pub open_since: Option<u64>,
    pub hour_latch: bool,
}

#[derive(Debug, Default)]
pub struct AutomationEngine {
    state: AutomationState,
}

impl AutomationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AutomationState {
        self.state
    }

    /// Process one classified sample.
    ///
    /// `distance` is only recorded in the log entry of a transition.
    pub fn on_event(
        &mut self,
        event: DoorEvent,
        distance: u32,
        now: u64,
        hour: u32,
        config: &AutomationConfig<'_>,
    ) -> Vec<Action> {
        let mut actions = Vec::new();

        if event.is_transition() {
            actions.push(Action::Log(LogEntry {
                tstamp: now,
                open: event == DoorEvent::JustOpened,
                distance,
            }));
        }

        if !config.any_enabled() {
            self.state.open_since = None;
            return actions;
        }

        match event {
            DoorEvent::JustOpened => {
                self.state.open_since = Some(now);
                if config.notify & NOTIFY_ON_OPEN != 0 {
                    actions.push(Action::Notify(format!("{} just OPENED!", config.name)));
                }
                // Opened by hand during the trigger hour: don't auto-close it.
                if hour == config.trigger_hour && !self.state.hour_latch {
                    debug!("Door opened during trigger hour {}, latching", hour);
                    self.state.hour_latch = true;
                }
            }
            DoorEvent::JustClosed => {
                self.state.open_since = None;
                if config.notify & NOTIFY_ON_CLOSE != 0 {
                    actions.push(Action::Notify(format!("{} just CLOSED!", config.name)));
                }
            }
            DoorEvent::RemainOpen => match self.state.open_since {
                None => self.state.open_since = Some(now),
                Some(since) => self.remain_open(since, now, hour, config, &mut actions),
            },
            DoorEvent::RemainClosed | DoorEvent::Mixed => {
                self.state.open_since = None;
            }
        }

        actions
    }

    fn remain_open(
        &mut self,
        since: u64,
        now: u64,
        hour: u32,
        config: &AutomationConfig<'_>,
        actions: &mut Vec<Action>,
    ) {
        let timeout = u64::from(config.open_timeout_minutes) * 60;
        if now >= since + timeout {
            info!("Door open for {} min", config.open_timeout_minutes);
            let text = format!(
                "{} is left open for more than {} minutes.{}",
                config.name,
                config.open_timeout_minutes,
                suffix(config.open_timeout_action)
            );
            fire(config.open_timeout_action, text, actions);
            self.state.open_since = None;
        }

        if hour == config.trigger_hour && !self.state.hour_latch {
            info!("Door open at trigger hour {}", hour);
            self.state.hour_latch = true;
            let text = format!(
                "{} is open after {} UTC. Current hour:{}{}",
                config.name,
                config.trigger_hour,
                hour,
                suffix(config.trigger_hour_action)
            );
            fire(config.trigger_hour_action, text, actions);
            self.state.open_since = None;
        } else if hour > config.trigger_hour && self.state.hour_latch {
            debug!("Unlocking hour trigger");
            self.state.hour_latch = false;
        }
    }
}

fn suffix(action: u32) -> &'static str {
    if action & AUTO_CLOSE != 0 {
        " It will be auto-closed shortly"
    } else {
        " This is a reminder for you."
    }
}

fn fire(action: u32, text: String, actions: &mut Vec<Action>) {
    if action & AUTO_NOTIFY != 0 {
        actions.push(Action::Notify(text));
    }
    if action & AUTO_CLOSE != 0 {
        actions.push(Action::Close);
    }
}
