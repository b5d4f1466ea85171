//! Device options.
//!
//! The option store is a flat table of named values, each either an
//! integer (with a max bound) or a string.  The core reads options by
//! key through typed accessors and never touches raw storage; the
//! [`ConfigPort`](crate::app::ports::ConfigPort) adapter persists the
//! whole table with `postcard`.
//!
//! Updates coming from the API are two-phase: [`Options::validate_update`]
//! checks every supplied field and returns an [`OptionUpdate`]; only then
//! does [`Options::apply`] write them all.  A single bad field rejects the
//! whole request.

use core::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::{RequestError, ResultCode};

/// Firmware version reported through the `fwv` option.
pub const FIRMWARE_VERSION: u32 = 130;

// ---------------------------------------------------------------------------
// Option keys and table
// ---------------------------------------------------------------------------

/// Every option the controller knows about.  Discriminants index
/// [`OPTION_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OptionKey {
    Fwv = 0,
    Mnt,
    Dth,
    Vth,
    Alm,
    Aoo,
    Lsz,
    Tsn,
    Htp,
    Cdt,
    Dri,
    Mod,
    Ati,
    Ato,
    Atib,
    Atob,
    Noto,
    Usi,
    Ssid,
    Pass,
    Auth,
    Bdmn,
    Bprt,
    Dkey,
    Name,
    Iftt,
    Mqtt,
    Dvip,
    Gwip,
    Subn,
    Dns1,
}

pub const NUM_OPTIONS: usize = 31;

/// Kind and default of a single option.
#[derive(Debug, Clone, Copy)]
pub enum OptionKind {
    Int { default: u32, max: u32 },
    Str { default: &'static str },
}

/// One row of the option table.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub key: OptionKey,
    pub name: &'static str,
    pub kind: OptionKind,
}

const fn int(key: OptionKey, name: &'static str, default: u32, max: u32) -> OptionSpec {
    OptionSpec {
        key,
        name,
        kind: OptionKind::Int { default, max },
    }
}

const fn text(key: OptionKey, name: &'static str, default: &'static str) -> OptionSpec {
    OptionSpec {
        key,
        name,
        kind: OptionKind::Str { default },
    }
}

/// The option table.  Order must match [`OptionKey`] discriminants.
pub const OPTION_TABLE: [OptionSpec; NUM_OPTIONS] = [
    int(OptionKey::Fwv, "fwv", FIRMWARE_VERSION, 255),
    int(OptionKey::Mnt, "mnt", 0, 3),
    int(OptionKey::Dth, "dth", 50, 65_535),
    int(OptionKey::Vth, "vth", 150, 65_535),
    int(OptionKey::Alm, "alm", 1, 2),
    int(OptionKey::Aoo, "aoo", 0, 1),
    int(OptionKey::Lsz, "lsz", 50, 400),
    int(OptionKey::Tsn, "tsn", 0, 4),
    int(OptionKey::Htp, "htp", 80, 65_535),
    int(OptionKey::Cdt, "cdt", 1000, 5000),
    int(OptionKey::Dri, "dri", 500, 6000),
    int(OptionKey::Mod, "mod", 0, 1),
    int(OptionKey::Ati, "ati", 30, 720),
    int(OptionKey::Ato, "ato", 0, 3),
    int(OptionKey::Atib, "atib", 3, 23),
    int(OptionKey::Atob, "atob", 0, 3),
    int(OptionKey::Noto, "noto", 3, 3),
    int(OptionKey::Usi, "usi", 0, 1),
    text(OptionKey::Ssid, "ssid", ""),
    text(OptionKey::Pass, "pass", ""),
    text(OptionKey::Auth, "auth", ""),
    text(OptionKey::Bdmn, "bdmn", "ws.cloud.openthings.io"),
    int(OptionKey::Bprt, "bprt", 80, 65_535),
    text(OptionKey::Dkey, "dkey", "opendoor"),
    text(OptionKey::Name, "name", "My Garage"),
    text(OptionKey::Iftt, "iftt", ""),
    text(OptionKey::Mqtt, "mqtt", ""),
    text(OptionKey::Dvip, "dvip", "192.168.1.205"),
    text(OptionKey::Gwip, "gwip", "192.168.1.1"),
    text(OptionKey::Subn, "subn", "255.255.255.0"),
    text(OptionKey::Dns1, "dns1", "8.8.8.8"),
];

impl OptionKey {
    pub fn spec(self) -> &'static OptionSpec {
        &OPTION_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        OPTION_TABLE.iter().find(|s| s.name == name).map(|s| s.key)
    }

    /// Options the generic update path may not touch.
    fn is_locked(self) -> bool {
        matches!(
            self,
            Self::Fwv | Self::Mod | Self::Ssid | Self::Pass | Self::Dkey
        )
    }

    /// Static-IP options, only written through the `usi=1` path.
    fn is_static_ip(self) -> bool {
        matches!(self, Self::Dvip | Self::Gwip | Self::Subn | Self::Dns1)
    }

    /// Lower bound enforced on top of the table max.
    fn min(self) -> u32 {
        match self {
            Self::Dri | Self::Cdt => 50,
            Self::Lsz => 20,
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

/// Physical sensor placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountType {
    /// Ultrasonic sensor on the ceiling, looking down at the door.
    Ceiling,
    /// Ultrasonic sensor on the side wall.
    Side,
    /// Reed switch at the bottom of the door track.
    SwitchLow,
    /// Reed switch at the top of the door track.
    SwitchHigh,
}

/// Whether the device provisions itself (AP) or joins a network (station).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceMode {
    AccessPoint,
    Station,
}

/// Bitflags shared by `ato` and `atob`.
pub const AUTO_NOTIFY: u32 = 0b01;
pub const AUTO_CLOSE: u32 = 0b10;

/// Bitflags of `noto`.
pub const NOTIFY_ON_OPEN: u32 = 0b01;
pub const NOTIFY_ON_CLOSE: u32 = 0b10;

/// The automation-relevant slice of the option table.
#[derive(Debug, Clone, Copy)]
pub struct AutomationConfig<'a> {
    pub name: &'a str,
    /// Minutes the door may stay open before the open-duration rule fires.
    pub open_timeout_minutes: u32,
    /// `AUTO_NOTIFY | AUTO_CLOSE` flags of the open-duration rule.
    pub open_timeout_action: u32,
    /// UTC hour (0–23) of the hour-of-day rule.
    pub trigger_hour: u32,
    /// `AUTO_NOTIFY | AUTO_CLOSE` flags of the hour-of-day rule.
    pub trigger_hour_action: u32,
    /// `NOTIFY_ON_OPEN | NOTIFY_ON_CLOSE` flags.
    pub notify: u32,
}

impl AutomationConfig<'_> {
    pub fn any_enabled(&self) -> bool {
        self.open_timeout_action != 0 || self.trigger_hour_action != 0 || self.notify != 0
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionValue {
    Int(u32),
    Str(String),
}

/// The live option table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    values: Vec<OptionValue>,
}

impl Default for Options {
    fn default() -> Self {
        let values = OPTION_TABLE
            .iter()
            .map(|spec| match spec.kind {
                OptionKind::Int { default, .. } => OptionValue::Int(default),
                OptionKind::Str { default } => OptionValue::Str(default.to_owned()),
            })
            .collect();
        Self { values }
    }
}

impl Options {
    /// True if every slot exists and holds the kind the table declares.
    /// Persisted blobs from another firmware layout fail this check.
    pub fn is_well_formed(&self) -> bool {
        self.values.len() == NUM_OPTIONS
            && OPTION_TABLE
                .iter()
                .zip(&self.values)
                .all(|(spec, v)| match (spec.kind, v) {
                    (OptionKind::Int { max, .. }, OptionValue::Int(i)) => *i <= max,
                    (OptionKind::Str { .. }, OptionValue::Str(_)) => true,
                    _ => false,
                })
    }

    pub fn int(&self, key: OptionKey) -> u32 {
        match self.values.get(key as usize) {
            Some(OptionValue::Int(v)) => *v,
            _ => 0,
        }
    }

    pub fn str(&self, key: OptionKey) -> &str {
        match self.values.get(key as usize) {
            Some(OptionValue::Str(s)) => s.as_str(),
            _ => "",
        }
    }

    pub fn set_int(&mut self, key: OptionKey, value: u32) {
        if let Some(slot) = self.values.get_mut(key as usize) {
            *slot = OptionValue::Int(value);
        }
    }

    pub fn set_str(&mut self, key: OptionKey, value: &str) {
        if let Some(slot) = self.values.get_mut(key as usize) {
            *slot = OptionValue::Str(value.to_owned());
        }
    }

    pub fn mount_type(&self) -> MountType {
        match self.int(OptionKey::Mnt) {
            1 => MountType::Side,
            2 => MountType::SwitchLow,
            3 => MountType::SwitchHigh,
            _ => MountType::Ceiling,
        }
    }

    pub fn device_mode(&self) -> DeviceMode {
        if self.int(OptionKey::Mod) == 1 {
            DeviceMode::Station
        } else {
            DeviceMode::AccessPoint
        }
    }

    pub fn set_device_mode(&mut self, mode: DeviceMode) {
        let v = match mode {
            DeviceMode::AccessPoint => 0,
            DeviceMode::Station => 1,
        };
        self.set_int(OptionKey::Mod, v);
    }

    /// Configured alarm length in seconds (0 = alarm disabled).
    pub fn alarm_seconds(&self) -> u32 {
        match self.int(OptionKey::Alm) {
            0 => 0,
            1 => 5,
            _ => 10,
        }
    }

    /// Sampling interval of the door pipeline in milliseconds.
    pub fn sample_interval_ms(&self) -> u64 {
        u64::from(self.int(OptionKey::Dri).max(50))
    }

    /// Relay pulse length in milliseconds.
    pub fn click_duration_ms(&self) -> u32 {
        self.int(OptionKey::Cdt).max(50)
    }

    pub fn broker_configured(&self) -> bool {
        self.str(OptionKey::Mqtt).len() > 8
    }

    pub fn automation(&self) -> AutomationConfig<'_> {
        AutomationConfig {
            name: self.str(OptionKey::Name),
            open_timeout_minutes: self.int(OptionKey::Ati),
            open_timeout_action: self.int(OptionKey::Ato),
            trigger_hour: self.int(OptionKey::Atib),
            trigger_hour_action: self.int(OptionKey::Atob),
            notify: self.int(OptionKey::Noto),
        }
    }

    /// Compare against the stored device key.
    pub fn device_key_matches(&self, key: &str) -> bool {
        self.str(OptionKey::Dkey) == key
    }

    /// All options as a JSON object, omitting the Wi-Fi password and the
    /// device key.
    pub fn public_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for spec in &OPTION_TABLE {
            if matches!(spec.key, OptionKey::Pass | OptionKey::Dkey) {
                continue;
            }
            let value = match &self.values[spec.key as usize] {
                OptionValue::Int(i) => serde_json::Value::from(*i),
                OptionValue::Str(s) => serde_json::Value::from(s.as_str()),
            };
            map.insert(spec.name.to_owned(), value);
        }
        serde_json::Value::Object(map)
    }

    // ── Two-phase update ──────────────────────────────────────

    /// Phase one: check every supplied parameter without touching `self`.
    ///
    /// `params` are the raw `(name, value)` pairs from the request.
    pub fn validate_update(&self, params: &[(&str, &str)]) -> Result<OptionUpdate, RequestError> {
        let mut changes = Vec::new();

        for spec in &OPTION_TABLE {
            if spec.key.is_locked() || spec.key.is_static_ip() {
                continue;
            }
            let Some(raw) = param(params, spec.name) else {
                continue;
            };
            match spec.kind {
                OptionKind::Int { max, .. } => {
                    let value: u32 = raw
                        .trim()
                        .parse()
                        .map_err(|_| RequestError::with_item(ResultCode::DataFormatError, spec.name))?;
                    if value > max || value < spec.key.min() {
                        return Err(RequestError::with_item(ResultCode::DataOutOfBound, spec.name));
                    }
                    changes.push((spec.key, OptionValue::Int(value)));
                }
                OptionKind::Str { .. } => {
                    changes.push((spec.key, OptionValue::Str(raw.to_owned())));
                }
            }
        }

        let static_ip = changes
            .iter()
            .any(|(k, v)| *k == OptionKey::Usi && *v == OptionValue::Int(1));
        if static_ip {
            for (key, required) in [
                (OptionKey::Dvip, true),
                (OptionKey::Gwip, true),
                (OptionKey::Subn, false),
                (OptionKey::Dns1, false),
            ] {
                match param(params, key.name()) {
                    Some(raw) => {
                        if raw.parse::<Ipv4Addr>().is_err() {
                            return Err(RequestError::with_item(
                                ResultCode::DataFormatError,
                                key.name(),
                            ));
                        }
                        changes.push((key, OptionValue::Str(raw.to_owned())));
                    }
                    None if required => {
                        return Err(RequestError::with_item(ResultCode::DataMissing, key.name()));
                    }
                    None => {}
                }
            }
        }

        if let Some(nkey) = param(params, "nkey") {
            match param(params, "ckey") {
                Some(ckey) if ckey == nkey => {
                    changes.push((OptionKey::Dkey, OptionValue::Str(nkey.to_owned())));
                }
                Some(_) => return Err(RequestError::with_item(ResultCode::Mismatch, "ckey")),
                None => return Err(RequestError::with_item(ResultCode::DataMissing, "ckey")),
            }
        }

        Ok(OptionUpdate { changes })
    }

    /// Phase two: write every validated change.
    pub fn apply(&mut self, update: OptionUpdate) {
        for (key, value) in update.changes {
            if let Some(slot) = self.values.get_mut(key as usize) {
                *slot = value;
            }
        }
    }
}

/// A validated, not yet applied set of option changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionUpdate {
    changes: Vec<(OptionKey, OptionValue)>,
}

impl OptionUpdate {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn touches(&self, key: OptionKey) -> bool {
        self.changes.iter().any(|(k, _)| *k == key)
    }
}

fn param<'a>(params: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}
