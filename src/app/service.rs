//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the lifecycle machine and every door component:
//! clock, debounce history, automation engine, alarm countdown and the
//! front-panel UI state.  It exposes a hardware-agnostic API; all I/O
//! flows through port traits injected at call sites, so the whole
//! controller runs against mock adapters.
//!
//! ```text
//!  DevicePorts ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │          AppService          │
//!   ConfigPort ◀──▶│ Lifecycle · Clock · Door     │◀──▶ EventLogPort
//!                  │ Automation · Alarm · UI      │
//!                  └──────────────────────────────┘
//! ```
//!
//! One [`tick`](AppService::tick) is one pass of the cooperative loop:
//! lifecycle dispatch first, then always-on UI and alarm servicing.  A
//! reset or reboot raised by the button is therefore seen by the next
//! pass's dispatch.

use log::{debug, info, warn};

use crate::alarm::{self, Actuation, AlarmCountdown, AlarmStep};
use crate::automation::{Action, AutomationEngine};
use crate::clock::SoftwareClock;
use crate::config::{DeviceMode, MountType, OptionKey, Options};
use crate::door::reading::{self, RawSample};
use crate::door::vehicle::{self, VehicleThresholds};
use crate::door::{DoorEvent, DoorHistory, LogEntry, SampleFilter, VehiclePresence};
use crate::error::{RequestError, ResultCode};
use crate::fsm::context::{LifecycleCommand, LifecycleContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::ui::led::SAMPLE_FLASH_MS;
use crate::ui::{ButtonEvent, ButtonSignal, ButtonTracker, IpReporter, LedMode, StatusLed};

use super::commands::{AppCommand, Auth, DoorCommand};
use super::events::AppEvent;
use super::ports::{
    ActuatorPort, ConfigPort, DevicePorts, EndpointSet, EventLogPort, EventSink, NetworkPort,
    NotifierPort,
};

/// Status is pushed to the broker at least this often (software-clock s).
pub const STATUS_PUBLISH_SECS: u64 = 15;

/// Minimum spacing of broker connect attempts (software-clock s).
pub const BROKER_RETRY_SECS: u64 = 50;

/// Drain time before an explicit reboot request fires.
pub const REBOOT_DRAIN_MS: u64 = 1_000;

// ───────────────────────────────────────────────────────────────
// Supporting types
// ───────────────────────────────────────────────────────────────

/// Names derived from the hardware address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// `AA:BB:CC:DD:EE:FF`.
    pub mac: String,
    /// Provisioning access point SSID.
    pub ap_ssid: String,
    /// Local name-service host name.
    pub host_name: String,
    pub chip_id: u32,
}

/// Latest door observation, as reported in the status view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorStatus {
    pub open: bool,
    pub distance: u32,
    pub vehicle: VehiclePresence,
    pub last_event: Option<DoorEvent>,
    /// Sample counter, wraps at 100.
    pub read_count: u32,
    pub climate: Option<(f32, f32)>,
}

impl Default for DoorStatus {
    fn default() -> Self {
        Self {
            open: false,
            distance: 0,
            vehicle: VehiclePresence::Disabled,
            last_event: None,
            read_count: 0,
            climate: None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    fsm: Fsm,
    ctx: LifecycleContext,
    options: Options,
    identity: DeviceIdentity,

    clock: SoftwareClock,
    history: DoorHistory,
    filter: SampleFilter,
    automation: AutomationEngine,
    alarm: AlarmCountdown,
    status: DoorStatus,

    button: ButtonTracker,
    led: StatusLed,
    ip_report: IpReporter,

    next_sample_ms: u64,
    next_publish_utc: u64,
    next_broker_attempt_utc: u64,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from loaded options.
    ///
    /// Does **not** start the lifecycle; call [`start`](Self::start) next.
    pub fn new(options: Options, identity: DeviceIdentity) -> Self {
        let ctx = LifecycleContext::new(options.device_mode(), options.broker_configured());
        let fsm = Fsm::new(build_state_table(), StateId::Initial);
        Self {
            fsm,
            ctx,
            options,
            identity,
            clock: SoftwareClock::default(),
            history: DoorHistory::new(),
            filter: SampleFilter::new(),
            automation: AutomationEngine::new(),
            alarm: AlarmCountdown::new(),
            status: DoorStatus::default(),
            button: ButtonTracker::new(),
            led: StatusLed::new(),
            ip_report: IpReporter::new(),
            next_sample_ms: 0,
            next_publish_utc: 0,
            next_broker_attempt_utc: 0,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!(
            "AppService started in {:?} ({:?} mode)",
            self.fsm.current_state(),
            self.options.device_mode()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop pass: lifecycle dispatch, then UI / alarm servicing.
    ///
    /// The `hw` parameter satisfies every device port at once, which
    /// avoids juggling several mutable borrows of the same board.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut impl DevicePorts,
        storage: &impl ConfigPort,
        log: &mut impl EventLogPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();

        // 1. Lifecycle dispatch
        self.ctx.now_ms = now_ms;
        self.ctx.associated = hw.is_associated();
        self.fsm.tick(&mut self.ctx);

        let commands = core::mem::take(&mut self.ctx.commands);
        for cmd in commands {
            self.apply(cmd, now_ms, hw, storage, log, sink);
        }

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        // 2. Always-on servicing
        self.service_ui(now_ms, hw, storage, sink);
        self.service_alarm(now_ms, hw, sink);
        hw.poll_outputs(now_ms);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external request.  Rejections leave all state as it was.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        auth: &Auth,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        storage: &impl ConfigPort,
        log: &mut impl EventLogPort,
        sink: &mut impl EventSink,
    ) -> Result<(), RequestError> {
        self.ctx.now_ms = self.ctx.now_ms.max(now_ms);
        let station = self.options.device_mode() == DeviceMode::Station;
        if cmd.station_only() && !station {
            return Err(RequestError::new(ResultCode::NotPermitted));
        }
        if matches!(cmd, AppCommand::SwitchNetwork { .. }) && station {
            return Err(RequestError::new(ResultCode::NotPermitted));
        }
        if cmd.needs_key() && !self.verify_device_key(auth) {
            return Err(RequestError::new(ResultCode::Unauthorized));
        }

        match cmd {
            AppCommand::Door(door) => self.door_command(door, now_ms, hw, sink),
            AppCommand::Reboot => self.request_reboot(REBOOT_DRAIN_MS, sink),
            AppCommand::ResetToAp => self.reset_to_ap(storage, sink),
            AppCommand::FactoryReset => self.factory_reset(),
            AppCommand::ClearLog => {
                if let Err(e) = log.reset() {
                    warn!("Clearing log failed: {}", e);
                }
            }
            AppCommand::SwitchNetwork { ssid, pass, auth: token } => {
                if ssid.is_empty() {
                    return Err(RequestError::with_item(ResultCode::DataMissing, "ssid"));
                }
                self.options.set_str(OptionKey::Ssid, &ssid);
                self.options.set_str(OptionKey::Pass, &pass);
                if let Some(token) = token.filter(|t| !t.is_empty()) {
                    self.options.set_str(OptionKey::Auth, &token);
                }
                self.persist(storage);
                self.fsm.force_transition(StateId::TryConnect, &mut self.ctx);
            }
            AppCommand::UpdateOptions(params) => {
                let pairs: Vec<(&str, &str)> = params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                let update = self.options.validate_update(&pairs)?;
                let changed = update.len();
                self.options.apply(update);
                self.ctx.broker_configured = self.options.broker_configured();
                self.persist(storage);
                sink.emit(&AppEvent::OptionsUpdated { changed });
            }
        }
        Ok(())
    }

    /// Cloud requests are trusted; local ones must carry the device key.
    pub fn verify_device_key(&self, auth: &Auth) -> bool {
        match auth {
            Auth::Trusted => true,
            Auth::DeviceKey(key) => self.options.device_key_matches(key),
            Auth::None => false,
        }
    }

    /// Arm a reboot `delay_ms` from now and drain in `WaitRestart`.
    /// Idempotent: a pending reboot is never moved.
    pub fn request_reboot(&mut self, delay_ms: u64, sink: &mut impl EventSink) {
        if self.ctx.request_restart(delay_ms, self.ctx.now_ms) {
            info!("Reboot scheduled in {} ms", delay_ms);
            sink.emit(&AppEvent::RebootScheduled { delay_ms });
        }
        self.fsm.force_transition(StateId::WaitRestart, &mut self.ctx);
    }

    /// Persist access-point mode and reboot into it.
    pub fn reset_to_ap(&mut self, storage: &impl ConfigPort, sink: &mut impl EventSink) {
        info!("Resetting to access point mode");
        self.options.set_device_mode(DeviceMode::AccessPoint);
        self.persist(storage);
        self.request_reboot(0, sink);
    }

    /// Wipe options and log on the next dispatch, then reboot.
    pub fn factory_reset(&mut self) {
        if self.ctx.restart_pending() {
            return;
        }
        warn!("Factory reset requested");
        self.fsm.force_transition(StateId::Reset, &mut self.ctx);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn door_status(&self) -> DoorStatus {
        self.status
    }

    pub fn utc_seconds(&self) -> u64 {
        self.clock.utc_seconds()
    }

    pub fn alarm_armed(&self) -> bool {
        self.alarm.is_armed()
    }

    pub fn hour_latch(&self) -> bool {
        self.automation.state().hour_latch
    }

    /// Controller status view.
    pub fn controller_json(&self, rssi: Option<i8>) -> serde_json::Value {
        let mut json = serde_json::json!({
            "dist": self.status.distance,
            "door": u8::from(self.status.open),
            "vehicle": self.status.vehicle.code(),
            "rcnt": self.status.read_count,
            "fwv": self.options.int(OptionKey::Fwv),
            "name": self.options.str(OptionKey::Name),
            "mac": self.identity.mac,
            "cid": self.identity.chip_id,
            "rssi": rssi.unwrap_or(0),
        });
        if self.options.int(OptionKey::Tsn) != 0 {
            if let (Some((temp, humid)), Some(map)) = (self.status.climate, json.as_object_mut()) {
                map.insert("temp".into(), serde_json::Value::from(temp));
                map.insert("humid".into(), serde_json::Value::from(humid));
            }
        }
        json
    }

    /// Options view (no password, no device key).
    pub fn options_json(&self) -> serde_json::Value {
        self.options.public_json()
    }

    /// Log view: up to `lsz` entries, oldest first, empty slots skipped.
    pub fn log_json(&self, log: &mut impl EventLogPort) -> serde_json::Value {
        let limit = self.options.int(OptionKey::Lsz) as usize;
        log.read_from_start();
        let mut entries = Vec::new();
        for _ in 0..limit {
            let Some(entry) = log.read_next() else {
                break;
            };
            if entry.tstamp == 0 {
                continue;
            }
            entries.push(entry.to_json());
        }
        serde_json::json!({
            "name": self.options.str(OptionKey::Name),
            "time": self.clock.utc_seconds(),
            "logs": entries,
        })
    }

    // ── Internal: lifecycle commands ──────────────────────────

    fn apply(
        &mut self,
        cmd: LifecycleCommand,
        now_ms: u64,
        hw: &mut impl DevicePorts,
        storage: &impl ConfigPort,
        log: &mut impl EventLogPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            LifecycleCommand::StartAccessPoint => hw.start_access_point(&self.identity.ap_ssid),
            LifecycleCommand::StartCaptiveDns => hw.start_captive_dns(),
            LifecycleCommand::RegisterApEndpoints => hw.register_endpoints(EndpointSet::AccessPoint),
            LifecycleCommand::BeginStation => hw.begin_station(
                self.options.str(OptionKey::Ssid),
                self.options.str(OptionKey::Pass),
            ),
            LifecycleCommand::BeginStationWithAp => hw.begin_station_with_ap(
                self.options.str(OptionKey::Ssid),
                self.options.str(OptionKey::Pass),
            ),
            LifecycleCommand::RegisterStationEndpoints => hw.register_endpoints(EndpointSet::Station),
            LifecycleCommand::RegisterNameService => {
                if !hw.register_name_service(&self.identity.host_name) {
                    warn!("Name service registration failed");
                }
            }
            LifecycleCommand::ConnectBroker => self.connect_broker(hw),
            LifecycleCommand::ServeRequests => hw.serve_requests(),
            LifecycleCommand::RunPipeline => self.run_pipeline(now_ms, hw, log, sink),
            LifecycleCommand::PersistStationMode => {
                self.options.set_device_mode(DeviceMode::Station);
                self.persist(storage);
            }
            LifecycleCommand::SetLed(mode) => self.led.set_mode(mode),
            LifecycleCommand::WipeConfig => {
                if let Err(e) = storage.erase() {
                    warn!("Erasing options failed: {}", e);
                }
                self.options = Options::default();
            }
            LifecycleCommand::ClearLog => {
                if let Err(e) = log.reset() {
                    warn!("Clearing log failed: {}", e);
                }
            }
            LifecycleCommand::Reboot => {
                sink.emit(&AppEvent::Rebooting);
                info!("Rebooting");
                hw.restart();
            }
        }
    }

    fn persist(&self, storage: &impl ConfigPort) {
        if let Err(e) = storage.save(&self.options) {
            warn!("Saving options failed: {}", e);
        }
    }

    // ── Internal: station pipeline ────────────────────────────

    fn run_pipeline(
        &mut self,
        now_ms: u64,
        hw: &mut impl DevicePorts,
        log: &mut impl EventLogPort,
        sink: &mut impl EventSink,
    ) {
        let was_synced = self.clock.is_synced();
        let utc = self.clock.now(now_ms, hw);
        if !was_synced && self.clock.is_synced() {
            sink.emit(&AppEvent::ClockSynced(utc));
        }

        if now_ms >= self.next_sample_ms {
            self.next_sample_ms = now_ms + self.options.sample_interval_ms();
            self.sample(now_ms, utc, hw, log, sink);
        }

        if self.options.broker_configured() {
            if hw.broker_connected() {
                hw.broker_keep_alive();
            } else if utc >= self.next_broker_attempt_utc {
                self.connect_broker(hw);
            }
        }
    }

    fn connect_broker(&mut self, hw: &mut impl NetworkPort) {
        let server = self.options.str(OptionKey::Mqtt);
        let client_id = self.options.str(OptionKey::Name);
        self.next_broker_attempt_utc = self.clock.utc_seconds() + BROKER_RETRY_SECS;
        if hw.connect_broker(server, client_id) {
            info!("Broker connect to {} started", server);
        } else {
            debug!("Broker connect to {} failed, retry in {} s", server, BROKER_RETRY_SECS);
        }
    }

    fn sample(
        &mut self,
        now_ms: u64,
        utc: u64,
        hw: &mut impl DevicePorts,
        log: &mut impl EventLogPort,
        sink: &mut impl EventSink,
    ) {
        let mount = self.options.mount_type();
        let door_threshold = self.options.int(OptionKey::Dth);

        let raw = match mount {
            MountType::Ceiling | MountType::Side => hw.read_distance().map(RawSample::Distance),
            MountType::SwitchLow | MountType::SwitchHigh => hw.read_switch().map(RawSample::Switch),
        };
        let fresh = raw.and_then(|r| reading::interpret(mount, door_threshold, r));
        let Some(reading) = self.filter.accept(fresh) else {
            debug!("No valid door reading yet");
            return;
        };
        self.led.flash(now_ms, SAMPLE_FLASH_MS);

        let event = self.history.sample(reading.open);
        let presence = vehicle::classify(
            mount,
            VehicleThresholds {
                door: door_threshold,
                vehicle: self.options.int(OptionKey::Vth),
            },
            reading.distance,
            reading.open,
        );

        self.status.open = reading.open;
        self.status.distance = reading.distance;
        self.status.vehicle = presence;
        self.status.last_event = Some(event);
        self.status.read_count = (self.status.read_count + 1) % 100;
        if self.options.int(OptionKey::Tsn) != 0 {
            self.status.climate = hw.read_temperature_humidity().or(self.status.climate);
        }

        if event.is_transition() {
            info!(
                "Door {} (dist={}cm, vehicle={:?})",
                if reading.open { "OPENED" } else { "CLOSED" },
                reading.distance,
                presence
            );
            sink.emit(&AppEvent::DoorChanged {
                event,
                distance: reading.distance,
                vehicle: presence,
                at: utc,
            });
        }

        if event.is_transition() || utc >= self.next_publish_utc {
            if self.options.broker_configured() && hw.broker_connected() {
                if let Err(e) = hw.publish_state(reading.open) {
                    warn!("State publish failed: {}", e);
                }
            }
            self.next_publish_utc = utc + STATUS_PUBLISH_SECS;
        }

        // Log stamps and the open-duration timer need wall-clock time.
        if !self.clock.is_synced() {
            return;
        }

        let config = self.options.automation();
        let actions = self.automation.on_event(
            event,
            reading.distance,
            utc,
            self.clock.hour(),
            &config,
        );
        for action in actions {
            match action {
                Action::Log(entry) => self.write_log(log, &entry),
                Action::Notify(text) => notify(hw, &text, sink),
                Action::Close => {
                    let actuation = alarm::automation_actuation(self.options.alarm_seconds());
                    self.actuate(actuation, now_ms, hw, sink);
                }
            }
        }
    }

    fn write_log(&self, log: &mut impl EventLogPort, entry: &LogEntry) {
        if let Err(e) = log.append(entry) {
            warn!("Log append failed: {}", e);
        }
    }

    // ── Internal: actuation ───────────────────────────────────

    fn door_command(
        &mut self,
        cmd: DoorCommand,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if !cmd.applies_to(self.status.open) {
            info!("{:?} ignored, door already in requested state", cmd);
            return;
        }
        let actuation = alarm::manual_actuation(
            self.options.alarm_seconds(),
            self.options.int(OptionKey::Aoo) != 0,
            self.status.open,
        );
        self.actuate(actuation, now_ms, hw, sink);
    }

    fn actuate(
        &mut self,
        actuation: Actuation,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        match actuation {
            Actuation::ClickNow => self.click(now_ms, hw, sink),
            Actuation::Alarm(ticks) => {
                self.alarm.arm(ticks);
                sink.emit(&AppEvent::AlarmArmed { ticks });
            }
        }
    }

    fn click(&mut self, now_ms: u64, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        hw.click_relay(self.options.click_duration_ms(), now_ms);
        sink.emit(&AppEvent::RelayClicked);
    }

    // ── Internal: always-on servicing ─────────────────────────

    fn service_ui(
        &mut self,
        now_ms: u64,
        hw: &mut impl DevicePorts,
        storage: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let pressed = hw.button_pressed();
        match self.button.poll(pressed, now_ms) {
            Some(ButtonSignal::Holding { led_on }) => self.led.set_mode(LedMode::Steady(led_on)),
            Some(ButtonSignal::Released(event)) => {
                info!("Button: {:?}", event);
                match event {
                    ButtonEvent::Click => self.click(now_ms, hw, sink),
                    ButtonEvent::ReportIp => match hw.local_ip() {
                        Some(ip) => self.ip_report.start(ip, now_ms),
                        None => debug!("No address to report"),
                    },
                    ButtonEvent::ResetToAp => self.reset_to_ap(storage, sink),
                    ButtonEvent::FactoryReset => self.factory_reset(),
                }
            }
            None => {}
        }

        if let Some(on) = self.led.poll(now_ms) {
            hw.set_led(on);
        }
        if let Some(hz) = self.ip_report.poll(now_ms) {
            hw.set_tone(hz);
        }
    }

    fn service_alarm(&mut self, now_ms: u64, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        match self.alarm.poll(now_ms) {
            Some(AlarmStep::Tone(hz)) => hw.set_tone(hz),
            Some(AlarmStep::Silence) => hw.set_tone(0),
            Some(AlarmStep::Fire) => {
                hw.set_tone(0);
                self.click(now_ms, hw, sink);
            }
            None => {}
        }
    }
}

/// Best effort: failures are logged and reported, never retried.
fn notify(hw: &mut impl NotifierPort, text: &str, sink: &mut impl EventSink) {
    info!("Notify: {}", text);
    match hw.notify(text) {
        Ok(()) => sink.emit(&AppEvent::NotificationSent),
        Err(e) => {
            warn!("Notification failed: {}", e);
            sink.emit(&AppEvent::NotificationFailed(e));
        }
    }
}
