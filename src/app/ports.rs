//! Port traits: the hexagonal boundary between the controller core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, relay, radio, notifiers, storage) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes
//! them via generics, so the core never touches hardware directly and
//! runs unchanged against the recording mocks in `tests/`.
//!
//! None of the port calls may block the loop.  Anything that takes time
//! on the device (association, broker connect, SNTP) is started by one
//! call and observed by polling on later iterations.

use core::net::Ipv4Addr;

use crate::config::Options;
use crate::door::LogEntry;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw door and environment readings.
///
/// Every read is fallible but never blocks; `None` means "no reading
/// this time" and the pipeline treats it as no new information.
pub trait SensorPort {
    /// Distance to the nearest object in centimetres (ultrasonic mounts).
    fn read_distance(&mut self) -> Option<u32>;

    /// Door switch level, `true` = HIGH (switch mounts).
    fn read_switch(&mut self) -> Option<bool>;

    /// Temperature (°C) and relative humidity (%), if a sensor is fitted.
    fn read_temperature_humidity(&mut self) -> Option<(f32, f32)>;

    /// Whether the front-panel button is currently held down.
    fn button_pressed(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait ActuatorPort {
    /// Start a relay pulse of `pulse_ms`.  Must return immediately; the
    /// adapter ends the pulse from [`poll_outputs`](Self::poll_outputs).
    fn click_relay(&mut self, pulse_ms: u32, now_ms: u64);

    /// Drive the buzzer at `hz`, or silence it with `0`.
    fn set_tone(&mut self, hz: u32);

    /// Status LED on/off.
    fn set_led(&mut self, on: bool);

    /// Service time-based outputs (relay pulse end).  Called once per loop.
    fn poll_outputs(&mut self, _now_ms: u64) {}
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain ↔ radio / servers)
// ───────────────────────────────────────────────────────────────

/// Which request handler set the HTTP layer should expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSet {
    /// Provisioning portal: scan, change network, try connect, reset.
    AccessPoint,
    /// Full controller API: status, options, logs, commands, update.
    Station,
}

pub trait NetworkPort {
    fn start_access_point(&mut self, ssid: &str);
    fn start_captive_dns(&mut self);

    /// Begin association with the configured network.
    fn begin_station(&mut self, ssid: &str, pass: &str);

    /// Begin association while keeping the access point up.
    fn begin_station_with_ap(&mut self, ssid: &str, pass: &str);

    fn is_associated(&mut self) -> bool;
    fn local_ip(&mut self) -> Option<Ipv4Addr>;

    /// Register the handler set.  Called at most once per set per boot.
    fn register_endpoints(&mut self, set: EndpointSet);

    /// Advertise `host` on the local name service.  Best effort.
    fn register_name_service(&mut self, host: &str) -> bool;

    /// Start a broker session.  Returns `true` once connected.
    fn connect_broker(&mut self, server: &str, client_id: &str) -> bool;
    fn broker_connected(&mut self) -> bool;
    fn broker_keep_alive(&mut self);

    /// Let the HTTP / DNS / update stack process pending requests.
    fn serve_requests(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Notifier port (driven adapter: domain → webhook / broker)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget notification sink.  Failures are reported back so
/// the service can log them; they are never retried.
pub trait NotifierPort {
    fn notify(&mut self, text: &str) -> Result<(), NotifyError>;

    /// Publish the current door state to the broker.
    fn publish_state(&mut self, open: bool) -> Result<(), NotifyError>;
}

// ───────────────────────────────────────────────────────────────
// Time source / system ports
// ───────────────────────────────────────────────────────────────

/// External UTC time source (SNTP on the device).
pub trait TimeSourcePort {
    /// Current UTC seconds, or anything below the sane epoch when the
    /// source has not synchronised yet.
    fn utc_now(&mut self) -> u64;
}

pub trait SystemPort {
    /// Reboot the device.  On the device this does not return.
    fn restart(&mut self);
}

/// Everything the loop touches on the device side, bundled so one
/// `&mut` borrow satisfies every port at once.
pub trait DevicePorts:
    SensorPort + ActuatorPort + NetworkPort + NotifierPort + TimeSourcePort + SystemPort
{
}

impl<T> DevicePorts for T where
    T: SensorPort + ActuatorPort + NetworkPort + NotifierPort + TimeSourcePort + SystemPort
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent options)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the option table.
///
/// Implementations reject malformed tables with
/// [`ConfigError::ValidationFailed`] instead of persisting them.
pub trait ConfigPort {
    /// Load options.  Returns [`Options::default()`] if nothing is stored.
    fn load(&self) -> Result<Options, ConfigError>;

    fn save(&self, options: &Options) -> Result<(), ConfigError>;

    /// Drop the stored table; the next `load` yields defaults.
    fn erase(&self) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Event log port (driven adapter: domain ↔ circular log store)
// ───────────────────────────────────────────────────────────────

/// Bounded, circular door log.  Appending to a full log overwrites the
/// oldest entry.
pub trait EventLogPort {
    fn append(&mut self, entry: &LogEntry) -> Result<(), LogError>;

    /// Rewind the read cursor to the oldest entry.
    fn read_from_start(&mut self);

    /// Next entry after the cursor, oldest first.
    fn read_next(&mut self) -> Option<LogEntry>;

    /// Drop every entry.
    fn reset(&mut self) -> Result<(), LogError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No options found in storage (first boot).
    NotFound,
    /// Stored blob failed deserialisation or layout check.
    Corrupted,
    /// The table failed validation; names the offending option.
    ValidationFailed(&'static str),
    StorageFull,
    IoError,
}

/// Errors from [`NotifierPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// No webhook / broker is configured.
    NotConfigured,
    /// Broker session is down.
    Disconnected,
    /// Transport-level failure.
    Transport(&'static str),
    /// Remote answered with a non-success status.
    Rejected(u16),
}

/// Errors from [`EventLogPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    IoError,
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "not configured"),
            Self::Disconnected => write!(f, "broker disconnected"),
            Self::Transport(msg) => write!(f, "transport: {}", msg),
            Self::Rejected(status) => write!(f, "rejected with status {}", status),
        }
    }
}

impl core::fmt::Display for LogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "log corrupted"),
        }
    }
}
