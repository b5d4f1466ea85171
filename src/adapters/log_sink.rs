//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one line per application event to
//! the logger (UART / USB-CDC on the device).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::ClockSynced(utc) => {
                info!("CLOCK | synced utc={}", utc);
            }
            AppEvent::DoorChanged {
                event,
                distance,
                vehicle,
                at,
            } => {
                info!(
                    "DOOR  | event={:?} dist={}cm vehicle={:?} t={}",
                    event, distance, vehicle, at
                );
            }
            AppEvent::NotificationSent => {
                info!("NOTIF | sent");
            }
            AppEvent::NotificationFailed(e) => {
                warn!("NOTIF | failed: {}", e);
            }
            AppEvent::AlarmArmed { ticks } => {
                info!("ALARM | armed, {} half-second ticks", ticks);
            }
            AppEvent::RelayClicked => {
                info!("RELAY | click");
            }
            AppEvent::OptionsUpdated { changed } => {
                info!("OPTS  | {} option(s) updated", changed);
            }
            AppEvent::RebootScheduled { delay_ms } => {
                info!("BOOT  | reboot in {} ms", delay_ms);
            }
            AppEvent::Rebooting => {
                warn!("BOOT  | rebooting now");
            }
        }
    }
}
