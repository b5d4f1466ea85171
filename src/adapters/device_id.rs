//! Device identity derived from the ESP32 factory MAC address.
//!
//! The provisioning access point and the name-service host both use
//! `OG_XXYYZZ` (last 3 bytes of the MAC, uppercase hex).  The chip id
//! is the same three bytes read as a number.

use core::fmt::Write;

use crate::app::service::DeviceIdentity;

/// `OG_XXYYZZ`.
pub type ApSsidString = heapless::String<16>;

/// `AA:BB:CC:DD:EE:FF`.
pub type MacString = heapless::String<18>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly 6 bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn ap_ssid(mac: &MacAddress) -> ApSsidString {
    let mut ssid = ApSsidString::new();
    let _ = write!(ssid, "OG_{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    ssid
}

pub fn mac_string(mac: &MacAddress) -> MacString {
    let mut s = MacString::new();
    for (i, b) in mac.iter().enumerate() {
        if i > 0 {
            let _ = s.push(':');
        }
        let _ = write!(s, "{:02X}", b);
    }
    s
}

pub fn chip_id(mac: &MacAddress) -> u32 {
    u32::from_be_bytes([0, mac[3], mac[4], mac[5]])
}

/// Everything the service needs to know about who it is.
pub fn identity(mac: &MacAddress) -> DeviceIdentity {
    let ssid = ap_ssid(mac);
    DeviceIdentity {
        mac: mac_string(mac).as_str().to_owned(),
        ap_ssid: ssid.as_str().to_owned(),
        host_name: ssid.as_str().to_owned(),
        chip_id: chip_id(mac),
    }
}
