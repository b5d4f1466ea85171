//! The whole device behind one value.
//!
//! [`Board`] composes the pin-level hardware adapter with the radio,
//! notifier and time adapters so a single `&mut Board` satisfies
//! [`DevicePorts`](crate::app::ports::DevicePorts).

use core::net::Ipv4Addr;

use log::info;

use crate::app::ports::{
    ActuatorPort, EndpointSet, NetworkPort, NotifierPort, NotifyError, SensorPort, SystemPort,
    TimeSourcePort,
};

use super::notifier::Notifier;
use super::time::SntpTimeSource;
use super::wifi::WifiAdapter;

pub struct Board<H> {
    pub hw: H,
    pub wifi: WifiAdapter,
    pub notifier: Notifier,
    pub sntp: SntpTimeSource,
    /// Simulation: set once a restart was requested.
    #[cfg(not(target_os = "espidf"))]
    pub restarted: bool,
}

impl<H> Board<H> {
    pub fn new(hw: H, wifi: WifiAdapter, notifier: Notifier, sntp: SntpTimeSource) -> Self {
        Self {
            hw,
            wifi,
            notifier,
            sntp,
            #[cfg(not(target_os = "espidf"))]
            restarted: false,
        }
    }
}

impl<H: SensorPort> SensorPort for Board<H> {
    fn read_distance(&mut self) -> Option<u32> {
        self.hw.read_distance()
    }

    fn read_switch(&mut self) -> Option<bool> {
        self.hw.read_switch()
    }

    fn read_temperature_humidity(&mut self) -> Option<(f32, f32)> {
        self.hw.read_temperature_humidity()
    }

    fn button_pressed(&mut self) -> bool {
        self.hw.button_pressed()
    }
}

impl<H: ActuatorPort> ActuatorPort for Board<H> {
    fn click_relay(&mut self, pulse_ms: u32, now_ms: u64) {
        self.hw.click_relay(pulse_ms, now_ms);
    }

    fn set_tone(&mut self, hz: u32) {
        self.hw.set_tone(hz);
    }

    fn set_led(&mut self, on: bool) {
        self.hw.set_led(on);
    }

    fn poll_outputs(&mut self, now_ms: u64) {
        self.hw.poll_outputs(now_ms);
    }
}

impl<H> NetworkPort for Board<H> {
    fn start_access_point(&mut self, ssid: &str) {
        self.wifi.start_access_point(ssid);
    }

    fn start_captive_dns(&mut self) {
        // Served by the HTTP layer's DNS responder.
        info!("Captive DNS requested");
    }

    fn begin_station(&mut self, ssid: &str, pass: &str) {
        self.wifi.begin_station(ssid, pass, false);
    }

    fn begin_station_with_ap(&mut self, ssid: &str, pass: &str) {
        self.wifi.begin_station(ssid, pass, true);
    }

    fn is_associated(&mut self) -> bool {
        self.wifi.is_associated()
    }

    fn local_ip(&mut self) -> Option<Ipv4Addr> {
        self.wifi.local_ip()
    }

    fn register_endpoints(&mut self, set: EndpointSet) {
        self.wifi.register_endpoints(set);
    }

    fn register_name_service(&mut self, host: &str) -> bool {
        self.wifi.register_name_service(host)
    }

    fn connect_broker(&mut self, server: &str, client_id: &str) -> bool {
        self.notifier.connect_broker(server, client_id)
    }

    fn broker_connected(&mut self) -> bool {
        self.notifier.broker_connected()
    }

    fn broker_keep_alive(&mut self) {
        self.notifier.keep_alive();
    }

    fn serve_requests(&mut self) {
        // The HTTP server runs in its own task on the device.
    }
}

impl<H> NotifierPort for Board<H> {
    fn notify(&mut self, text: &str) -> Result<(), NotifyError> {
        self.notifier.notify(text)
    }

    fn publish_state(&mut self, open: bool) -> Result<(), NotifyError> {
        self.notifier.publish_state(open)
    }
}

impl<H> TimeSourcePort for Board<H> {
    fn utc_now(&mut self) -> u64 {
        self.sntp.query()
    }
}

impl<H> SystemPort for Board<H> {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        esp_idf_svc::hal::reset::restart();
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        info!("System(sim): restart");
        self.restarted = true;
    }
}
