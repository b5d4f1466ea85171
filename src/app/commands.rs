//! Inbound commands to the application service.
//!
//! These represent requests from the HTTP API, the broker and the cloud
//! relay.  The [`AppService`](super::service::AppService) checks mode and
//! authorisation, then acts or rejects with a
//! [`RequestError`](crate::error::RequestError).

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Cloud relay and broker requests are trusted as-is.
    Trusted,
    /// Local request carrying a `dkey` parameter.
    DeviceKey(String),
    /// Local request without a key.
    None,
}

/// Door movement requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorCommand {
    /// Toggle, whatever the current state.
    Click,
    /// Only acts if the door is closed.
    Open,
    /// Only acts if the door is open.
    Close,
}

impl DoorCommand {
    /// Whether the command makes sense for the current door state.
    pub fn applies_to(self, door_open: bool) -> bool {
        match self {
            Self::Click => true,
            Self::Open => !door_open,
            Self::Close => door_open,
        }
    }
}

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Door(DoorCommand),

    /// Reboot after a short drain.
    Reboot,

    /// Switch back to access point mode and reboot.
    ResetToAp,

    /// Wipe options and log, then reboot.
    FactoryReset,

    ClearLog,

    /// Provisioning portal: store credentials and try to associate.
    SwitchNetwork {
        ssid: String,
        pass: String,
        auth: Option<String>,
    },

    /// Two-phase option update with raw `(name, value)` pairs.
    UpdateOptions(Vec<(String, String)>),
}

impl AppCommand {
    /// Commands only served in station mode.
    pub fn station_only(&self) -> bool {
        matches!(
            self,
            Self::Door(_) | Self::Reboot | Self::ResetToAp | Self::ClearLog | Self::UpdateOptions(_)
        )
    }

    /// Commands that need a valid device key unless trusted.
    pub fn needs_key(&self) -> bool {
        !matches!(self, Self::SwitchNetwork { .. })
    }
}

/// Translate a broker message into a door command.
///
/// `Button` on any topic clicks; `<name>/IN/STATE` accepts `open`,
/// `close` and `click`.
pub fn parse_broker_message(name: &str, topic: &str, payload: &str) -> Option<DoorCommand> {
    if payload == "Button" {
        return Some(DoorCommand::Click);
    }
    let rest = topic.strip_prefix(name)?;
    if rest != "/IN/STATE" {
        return None;
    }
    match payload {
        "open" => Some(DoorCommand::Open),
        "close" => Some(DoorCommand::Close),
        "click" => Some(DoorCommand::Click),
        _ => None,
    }
}
