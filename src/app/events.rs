//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, broker, nothing).

use crate::door::{DoorEvent, VehiclePresence};
use crate::fsm::StateId;

use super::ports::NotifyError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial lifecycle state).
    Started(StateId),

    /// The lifecycle machine moved between states.
    StateChanged { from: StateId, to: StateId },

    /// The software clock synchronised for the first time.
    ClockSynced(u64),

    /// A debounced door transition.
    DoorChanged {
        event: DoorEvent,
        distance: u32,
        vehicle: VehiclePresence,
        at: u64,
    },

    NotificationSent,
    NotificationFailed(NotifyError),

    /// The alarm countdown started.
    AlarmArmed { ticks: u32 },

    RelayClicked,

    /// Options were validated, applied and persisted.
    OptionsUpdated { changed: usize },

    /// A reboot timer was armed.
    RebootScheduled { delay_ms: u64 },

    /// The reboot is being carried out now.
    Rebooting,
}
