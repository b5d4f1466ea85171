//! Recording mock adapters for integration tests.
//!
//! [`MockBoard`] satisfies every device port at once and records each
//! outbound call so tests can assert on the full history without real
//! GPIO, radio or broker.  [`Rig`] wires it to an [`AppService`] with an
//! in-memory option store, the real ring log and a recording sink.

use std::cell::{Cell, RefCell};
use std::net::Ipv4Addr;

use garagectl::adapters::device_id;
use garagectl::adapters::event_log::RingLog;
use garagectl::app::commands::{AppCommand, Auth};
use garagectl::app::events::AppEvent;
use garagectl::app::ports::{
    ActuatorPort, ConfigError, ConfigPort, EndpointSet, EventSink, NetworkPort, NotifierPort,
    NotifyError, SensorPort, SystemPort, TimeSourcePort,
};
use garagectl::app::service::AppService;
use garagectl::config::{DeviceMode, OptionKey, Options};
use garagectl::error::RequestError;
use garagectl::fsm::StateId;

/// 2023-11-14T22:13:20Z.
pub const T0_UTC: u64 = 1_700_000_000;

/// Loop period used by [`Rig::run_for`].
pub const STEP_MS: u64 = 100;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    ClickRelay { pulse_ms: u32 },
    Tone(u32),
    Led(bool),
    StartAp(String),
    CaptiveDns,
    BeginStation { ssid: String, keep_ap: bool },
    Endpoints(EndpointSet),
    NameService(String),
    ConnectBroker(String),
    KeepAlive,
    Notify(String),
    PublishState(bool),
    Restart,
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub calls: Vec<HwCall>,
    pub distance: Option<u32>,
    pub switch: Option<bool>,
    pub climate: Option<(f32, f32)>,
    pub button: bool,
    pub associated: bool,
    pub ip: Option<Ipv4Addr>,
    /// What the time source answers; `0` = not synced.
    pub utc: u64,
    pub broker_reachable: bool,
    pub broker_up: bool,
    pub notify_result: Result<(), NotifyError>,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            distance: Some(200),
            switch: Some(true),
            climate: None,
            button: false,
            associated: false,
            ip: None,
            utc: T0_UTC,
            broker_reachable: true,
            broker_up: false,
            notify_result: Ok(()),
        }
    }

    pub fn count(&self, pred: impl Fn(&HwCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn clicks(&self) -> usize {
        self.count(|c| matches!(c, HwCall::ClickRelay { .. }))
    }

    pub fn restarts(&self) -> usize {
        self.count(|c| *c == HwCall::Restart)
    }

    pub fn notifications(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Notify(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Bring the station link up with a fixed address.
    pub fn link_up(&mut self) {
        self.associated = true;
        self.ip = Some(Ipv4Addr::new(192, 168, 1, 42));
    }

    pub fn link_down(&mut self) {
        self.associated = false;
        self.ip = None;
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockBoard {
    fn read_distance(&mut self) -> Option<u32> {
        self.distance
    }

    fn read_switch(&mut self) -> Option<bool> {
        self.switch
    }

    fn read_temperature_humidity(&mut self) -> Option<(f32, f32)> {
        self.climate
    }

    fn button_pressed(&mut self) -> bool {
        self.button
    }
}

impl ActuatorPort for MockBoard {
    fn click_relay(&mut self, pulse_ms: u32, _now_ms: u64) {
        self.calls.push(HwCall::ClickRelay { pulse_ms });
    }

    fn set_tone(&mut self, hz: u32) {
        self.calls.push(HwCall::Tone(hz));
    }

    fn set_led(&mut self, on: bool) {
        self.calls.push(HwCall::Led(on));
    }
}

impl NetworkPort for MockBoard {
    fn start_access_point(&mut self, ssid: &str) {
        self.calls.push(HwCall::StartAp(ssid.to_owned()));
    }

    fn start_captive_dns(&mut self) {
        self.calls.push(HwCall::CaptiveDns);
    }

    fn begin_station(&mut self, ssid: &str, _pass: &str) {
        self.calls.push(HwCall::BeginStation {
            ssid: ssid.to_owned(),
            keep_ap: false,
        });
    }

    fn begin_station_with_ap(&mut self, ssid: &str, _pass: &str) {
        self.calls.push(HwCall::BeginStation {
            ssid: ssid.to_owned(),
            keep_ap: true,
        });
    }

    fn is_associated(&mut self) -> bool {
        self.associated
    }

    fn local_ip(&mut self) -> Option<Ipv4Addr> {
        self.ip
    }

    fn register_endpoints(&mut self, set: EndpointSet) {
        self.calls.push(HwCall::Endpoints(set));
    }

    fn register_name_service(&mut self, host: &str) -> bool {
        self.calls.push(HwCall::NameService(host.to_owned()));
        true
    }

    fn connect_broker(&mut self, server: &str, _client_id: &str) -> bool {
        self.calls.push(HwCall::ConnectBroker(server.to_owned()));
        self.broker_up = self.broker_reachable;
        self.broker_up
    }

    fn broker_connected(&mut self) -> bool {
        self.broker_up
    }

    fn broker_keep_alive(&mut self) {
        self.calls.push(HwCall::KeepAlive);
    }

    fn serve_requests(&mut self) {}
}

impl NotifierPort for MockBoard {
    fn notify(&mut self, text: &str) -> Result<(), NotifyError> {
        self.calls.push(HwCall::Notify(text.to_owned()));
        self.notify_result.clone()
    }

    fn publish_state(&mut self, open: bool) -> Result<(), NotifyError> {
        self.calls.push(HwCall::PublishState(open));
        Ok(())
    }
}

impl TimeSourcePort for MockBoard {
    fn utc_now(&mut self) -> u64 {
        self.utc
    }
}

impl SystemPort for MockBoard {
    fn restart(&mut self) {
        self.calls.push(HwCall::Restart);
    }
}

// ── MockStore ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub stored: RefCell<Option<Options>>,
    pub saves: Cell<usize>,
    pub erases: Cell<usize>,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Option<Options> {
        self.stored.borrow().clone()
    }
}

impl ConfigPort for MockStore {
    fn load(&self) -> Result<Options, ConfigError> {
        self.stored.borrow().clone().ok_or(ConfigError::NotFound)
    }

    fn save(&self, options: &Options) -> Result<(), ConfigError> {
        self.saves.set(self.saves.get() + 1);
        *self.stored.borrow_mut() = Some(options.clone());
        Ok(())
    }

    fn erase(&self) -> Result<(), ConfigError> {
        self.erases.set(self.erases.get() + 1);
        *self.stored.borrow_mut() = None;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// A started service plus everything it talks to.
pub struct Rig {
    pub app: AppService,
    pub hw: MockBoard,
    pub store: MockStore,
    pub log: RingLog,
    pub sink: RecordingSink,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(options: Options) -> Self {
        let log = RingLog::new(options.int(OptionKey::Lsz) as usize);
        let identity = device_id::identity(&device_id::read_mac());
        let mut app = AppService::new(options, identity);
        let mut sink = RecordingSink::default();
        app.start(&mut sink);
        Self {
            app,
            hw: MockBoard::new(),
            store: MockStore::new(),
            log,
            sink,
            now_ms: 0,
        }
    }

    /// Station-mode rig, already associated and in `Connected`.
    pub fn station(options: Options) -> Self {
        Self::station_with_utc(options, T0_UTC)
    }

    /// Like [`Rig::station`], but the time source has no answer yet.
    pub fn station_unsynced(options: Options) -> Self {
        Self::station_with_utc(options, 0)
    }

    fn station_with_utc(mut options: Options, utc: u64) -> Self {
        options.set_device_mode(DeviceMode::Station);
        options.set_str(OptionKey::Ssid, "home");
        options.set_str(OptionKey::Pass, "hunter22");
        let mut rig = Self::new(options);
        rig.hw.utc = utc;
        rig.tick();
        rig.hw.link_up();
        rig.step();
        assert_eq!(rig.app.state(), StateId::Connected);
        rig
    }

    pub fn tick(&mut self) {
        self.app.tick(
            self.now_ms,
            &mut self.hw,
            &self.store,
            &mut self.log,
            &mut self.sink,
        );
    }

    /// Advance one loop period and tick.
    pub fn step(&mut self) {
        self.now_ms += STEP_MS;
        self.tick();
    }

    /// Keep ticking every [`STEP_MS`] for `ms`.
    pub fn run_for(&mut self, ms: u64) {
        for _ in 0..ms / STEP_MS {
            self.step();
        }
    }

    pub fn command(&mut self, cmd: AppCommand, auth: &Auth) -> Result<(), RequestError> {
        self.app.handle_command(
            cmd,
            auth,
            self.now_ms,
            &mut self.hw,
            &self.store,
            &mut self.log,
            &mut self.sink,
        )
    }

    /// Local request with the default device key.
    pub fn keyed(&mut self, cmd: AppCommand) -> Result<(), RequestError> {
        self.command(cmd, &Auth::DeviceKey("opendoor".to_owned()))
    }
}
