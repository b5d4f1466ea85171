//! Wi-Fi adapter: access point, station link and local name service.
//!
//! Every call only starts an operation; association progress is observed
//! through [`WifiAdapter::is_associated`] on later loop passes.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` in AP,
//!   station or mixed mode, `EspMdns` for the host name.
//! - **all other targets**: an in-memory link whose state tests drive
//!   through [`WifiAdapter::set_sim_link`].

use core::fmt;
use core::net::Ipv4Addr;
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};

use crate::app::ports::EndpointSet;

// ───────────────────────────────────────────────────────────────
// Errors and validation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiError {
    InvalidSsid,
    InvalidPassword,
    Driver(&'static str),
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes, or empty for open)"),
            Self::Driver(what) => write!(f, "Wi-Fi driver error: {}", what),
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), WifiError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(WifiError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), WifiError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(WifiError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    Off,
    AccessPoint,
    Station,
    /// Station association attempt with the access point kept up.
    Mixed,
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    mode: WifiMode,
    /// SSID of the access point once started, reused for mixed mode.
    ap_ssid: Option<String>,
    endpoints: Option<EndpointSet>,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    mdns: Option<esp_idf_svc::mdns::EspMdns>,
    #[cfg(not(target_os = "espidf"))]
    sim_ip: Option<Ipv4Addr>,
    #[cfg(not(target_os = "espidf"))]
    sim_rssi: i8,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: EspWifi<'static>) -> Self {
        Self {
            mode: WifiMode::Off,
            ap_ssid: None,
            endpoints: None,
            wifi,
            mdns: None,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            mode: WifiMode::Off,
            ap_ssid: None,
            endpoints: None,
            sim_ip: None,
            sim_rssi: -60,
        }
    }

    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    pub fn endpoints(&self) -> Option<EndpointSet> {
        self.endpoints
    }

    /// Simulation: bring the station link up with `ip`, or down with `None`.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_link(&mut self, ip: Option<Ipv4Addr>) {
        self.sim_ip = ip;
    }

    // ── Operations ────────────────────────────────────────────

    pub fn start_access_point(&mut self, ssid: &str) {
        info!("WiFi: starting access point '{}'", ssid);
        if let Err(e) = self.platform_start(Some(ssid), None) {
            warn!("WiFi: access point start failed: {}", e);
            return;
        }
        self.mode = WifiMode::AccessPoint;
        self.ap_ssid = Some(ssid.to_owned());
    }

    /// Start associating.  With `keep_ap` the access point started
    /// earlier stays up alongside the station.
    pub fn begin_station(&mut self, ssid: &str, pass: &str, keep_ap: bool) {
        if let Err(e) = validate_ssid(ssid).and_then(|()| validate_password(pass)) {
            warn!("WiFi: not associating: {}", e);
            return;
        }
        info!("WiFi: associating with '{}'", ssid);
        let ap = if keep_ap { self.ap_ssid.clone() } else { None };
        if let Err(e) = self.platform_start(ap.as_deref(), Some((ssid, pass))) {
            warn!("WiFi: station start failed: {}", e);
            return;
        }
        self.mode = if ap.is_some() {
            WifiMode::Mixed
        } else {
            WifiMode::Station
        };
    }

    pub fn register_endpoints(&mut self, set: EndpointSet) {
        if self.endpoints.is_some() {
            warn!("WiFi: endpoints already registered, ignoring {:?}", set);
            return;
        }
        info!("WiFi: endpoint set {:?} registered", set);
        self.endpoints = Some(set);
    }

    pub fn is_associated(&mut self) -> bool {
        matches!(self.mode, WifiMode::Station | WifiMode::Mixed) && self.local_ip().is_some()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, ap: Option<&str>, sta: Option<(&str, &str)>) -> Result<(), WifiError> {
        let ap_conf = ap
            .map(|ssid| -> Result<AccessPointConfiguration, WifiError> {
                Ok(AccessPointConfiguration {
                    ssid: ssid.try_into().map_err(|_| WifiError::InvalidSsid)?,
                    auth_method: AuthMethod::None,
                    ..Default::default()
                })
            })
            .transpose()?;
        let sta_conf = sta
            .map(|(ssid, pass)| -> Result<ClientConfiguration, WifiError> {
                Ok(ClientConfiguration {
                    ssid: ssid.try_into().map_err(|_| WifiError::InvalidSsid)?,
                    password: pass.try_into().map_err(|_| WifiError::InvalidPassword)?,
                    auth_method: if pass.is_empty() {
                        AuthMethod::None
                    } else {
                        AuthMethod::WPA2Personal
                    },
                    ..Default::default()
                })
            })
            .transpose()?;
        let conf = match (sta_conf, ap_conf) {
            (Some(sta), Some(ap)) => Configuration::Mixed(sta, ap),
            (Some(sta), None) => Configuration::Client(sta),
            (None, Some(ap)) => Configuration::AccessPoint(ap),
            (None, None) => return Ok(()),
        };
        self.wifi
            .set_configuration(&conf)
            .map_err(|_| WifiError::Driver("set_configuration"))?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| WifiError::Driver("start"))?;
        }
        if sta.is_some() {
            // Non-blocking: association completes in the background.
            self.wifi.connect().map_err(|_| WifiError::Driver("connect"))?;
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, ap: Option<&str>, sta: Option<(&str, &str)>) -> Result<(), WifiError> {
        if let Some(ssid) = ap {
            validate_ssid(ssid)?;
        }
        if sta.is_some() {
            self.sim_ip = None;
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    pub fn local_ip(&mut self) -> Option<Ipv4Addr> {
        if !self.wifi.is_connected().unwrap_or(false) {
            return None;
        }
        let info = self.wifi.sta_netif().get_ip_info().ok()?;
        let octets = info.ip.octets();
        let ip = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
        (!ip.is_unspecified()).then_some(ip)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn local_ip(&mut self) -> Option<Ipv4Addr> {
        self.sim_ip
    }

    #[cfg(target_os = "espidf")]
    pub fn rssi(&mut self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: fills a caller-owned record; fails when not associated.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        (ret == esp_idf_svc::sys::ESP_OK as i32).then_some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn rssi(&mut self) -> Option<i8> {
        self.sim_ip.map(|_| self.sim_rssi)
    }

    #[cfg(target_os = "espidf")]
    pub fn register_name_service(&mut self, host: &str) -> bool {
        if self.mdns.is_some() {
            return true;
        }
        let Ok(mut mdns) = esp_idf_svc::mdns::EspMdns::take() else {
            warn!("mDNS: take failed");
            return false;
        };
        if mdns.set_hostname(host).is_err() {
            warn!("mDNS: set_hostname '{}' failed", host);
            return false;
        }
        if mdns.add_service(None, "_http", "_tcp", 80, &[]).is_err() {
            warn!("mDNS: http service registration failed");
        }
        info!("mDNS: registered {}.local", host);
        self.mdns = Some(mdns);
        true
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn register_name_service(&mut self, host: &str) -> bool {
        info!("mDNS(sim): registered {}.local", host);
        true
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
