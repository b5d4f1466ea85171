//! End-to-end runs on the simulated board: the real host halves of the
//! Wi-Fi, notifier, SNTP, NVS, ring-log and hardware adapters, with
//! `embedded-hal` pins backed by shared cells.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use garagectl::adapters::board::Board;
use garagectl::adapters::device_id;
use garagectl::adapters::event_log::RingLog;
use garagectl::adapters::hardware::{Buzzer, HardwareAdapter, NoClimateSensor, RangeFinder};
use garagectl::adapters::log_sink::LogEventSink;
use garagectl::adapters::notifier::{Notifier, WEBHOOK_BASE};
use garagectl::adapters::nvs::NvsAdapter;
use garagectl::adapters::time::SntpTimeSource;
use garagectl::adapters::wifi::{WifiAdapter, WifiMode};
use garagectl::app::commands::{AppCommand, Auth, parse_broker_message};
use garagectl::app::ports::{ConfigPort, EndpointSet};
use garagectl::app::service::AppService;
use garagectl::config::{DeviceMode, OptionKey, Options};
use garagectl::drivers::inputs::{Button, DoorSwitch};
use garagectl::drivers::relay::Relay;
use garagectl::drivers::status_led::StatusLedPin;
use garagectl::fsm::StateId;

use crate::mock_hw::{STEP_MS, T0_UTC};

// ── Simulated parts ───────────────────────────────────────────

#[derive(Clone, Default)]
struct SimPin {
    level: Rc<Cell<bool>>,
    rises: Rc<Cell<u32>>,
}

impl SimPin {
    fn high() -> Self {
        let pin = Self::default();
        pin.level.set(true);
        pin
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.level.get() {
            self.rises.set(self.rises.get() + 1);
        }
        self.level.set(true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

struct SimRanger(Rc<Cell<Option<u32>>>);

impl RangeFinder for SimRanger {
    fn read_cm(&mut self) -> Option<u32> {
        self.0.get()
    }
}

struct SimBuzzer(Rc<RefCell<Vec<u32>>>);

impl Buzzer for SimBuzzer {
    fn tone(&mut self, hz: u32) {
        self.0.borrow_mut().push(hz);
    }
}

type SimHardware = HardwareAdapter<SimPin, SimPin, SimPin, SimPin>;

struct SimDevice {
    app: AppService,
    board: Board<SimHardware>,
    nvs: NvsAdapter,
    log: RingLog,
    sink: LogEventSink,
    now_ms: u64,
    relay: SimPin,
    distance: Rc<Cell<Option<u32>>>,
    tones: Rc<RefCell<Vec<u32>>>,
}

impl SimDevice {
    fn boot(options: Options) -> Self {
        let relay = SimPin::default();
        let distance = Rc::new(Cell::new(Some(200)));
        let tones = Rc::new(RefCell::new(Vec::new()));
        let hw = HardwareAdapter::new(
            Relay::new(relay.clone()),
            StatusLedPin::new(SimPin::default()),
            Button::new(SimPin::high()),
            DoorSwitch::new(SimPin::high()),
            Box::new(SimRanger(distance.clone())),
            Box::new(NoClimateSensor),
            Box::new(SimBuzzer(tones.clone())),
        );
        let mut sntp = SntpTimeSource::start();
        sntp.set_sim_utc(T0_UTC);
        let board = Board::new(hw, WifiAdapter::new(), Notifier::new(&options), sntp);

        let nvs = NvsAdapter::new().unwrap();
        nvs.save(&options).unwrap();
        let log = RingLog::new(options.int(OptionKey::Lsz) as usize);
        let mut sink = LogEventSink::new();
        let mut app = AppService::new(options, device_id::identity(&device_id::read_mac()));
        app.start(&mut sink);
        Self {
            app,
            board,
            nvs,
            log,
            sink,
            now_ms: 0,
            relay,
            distance,
            tones,
        }
    }

    /// One pass of the firmware loop, broker drain included.
    fn step(&mut self) {
        self.now_ms += STEP_MS;
        self.app.tick(
            self.now_ms,
            &mut self.board,
            &self.nvs,
            &mut self.log,
            &mut self.sink,
        );
        while let Some(msg) = self.board.notifier.take_message() {
            let name = self.app.options().str(OptionKey::Name);
            let Some(door) = parse_broker_message(name, &msg.topic, &msg.payload) else {
                continue;
            };
            self.app
                .handle_command(
                    AppCommand::Door(door),
                    &Auth::Trusted,
                    self.now_ms,
                    &mut self.board,
                    &self.nvs,
                    &mut self.log,
                    &mut self.sink,
                )
                .unwrap();
        }
    }

    fn run_for(&mut self, ms: u64) {
        for _ in 0..ms / STEP_MS {
            self.step();
        }
    }
}

fn station_options() -> Options {
    let mut o = Options::default();
    o.set_device_mode(DeviceMode::Station);
    o.set_str(OptionKey::Ssid, "home");
    o.set_str(OptionKey::Pass, "hunter22");
    o.set_str(OptionKey::Mqtt, "broker.local");
    o.set_str(OptionKey::Iftt, "abcdefgh");
    o
}

// ── Tests ─────────────────────────────────────────────────────

#[test]
fn provisioning_on_simulated_board() {
    let mut dev = SimDevice::boot(Options::default());
    dev.step();
    assert_eq!(dev.board.wifi.mode(), WifiMode::AccessPoint);
    assert_eq!(dev.board.wifi.endpoints(), Some(EndpointSet::AccessPoint));

    dev.app
        .handle_command(
            AppCommand::SwitchNetwork {
                ssid: "home".into(),
                pass: "hunter22".into(),
                auth: None,
            },
            &Auth::None,
            dev.now_ms,
            &mut dev.board,
            &dev.nvs,
            &mut dev.log,
            &mut dev.sink,
        )
        .unwrap();
    dev.step();
    assert_eq!(dev.board.wifi.mode(), WifiMode::Mixed);
    assert!(!dev.board.wifi.is_associated());

    dev.board.wifi.set_sim_link(Some(Ipv4Addr::new(10, 0, 0, 7)));
    dev.step();
    assert_eq!(dev.app.state(), StateId::WaitRestart);
    let stored = dev.nvs.load().unwrap();
    assert_eq!(stored.device_mode(), DeviceMode::Station);
    assert_eq!(stored.str(OptionKey::Ssid), "home");

    dev.run_for(10_000);
    assert!(dev.board.restarted);
}

#[test]
fn door_opening_reaches_webhook_and_broker() {
    let mut dev = SimDevice::boot(station_options());
    dev.step();
    assert_eq!(dev.board.wifi.mode(), WifiMode::Station);
    dev.board.wifi.set_sim_link(Some(Ipv4Addr::new(10, 0, 0, 7)));
    dev.step();
    assert_eq!(dev.app.state(), StateId::Connected);
    assert!(dev.board.notifier.broker_connected());

    dev.run_for(2_000);
    dev.distance.set(Some(30));
    dev.run_for(2_000);

    let outbox = &dev.board.notifier.outbox;
    let webhook = (
        format!("{}abcdefgh", WEBHOOK_BASE),
        r#"{"value1":"My Garage just OPENED!"}"#.to_owned(),
    );
    assert!(outbox.contains(&webhook));
    assert!(outbox.contains(&(
        "My Garage/OUT/NOTIFY".to_owned(),
        "My Garage just OPENED!".to_owned()
    )));
    assert!(outbox.contains(&("My Garage/OUT/STATE".to_owned(), "OPEN".to_owned())));
    assert!(outbox.contains(&("My Garage".to_owned(), "Open".to_owned())));
    assert_eq!(dev.log.len(), 1);
}

#[test]
fn broker_close_command_pulses_relay_after_alarm() {
    let mut dev = SimDevice::boot(station_options());
    dev.step();
    dev.board.wifi.set_sim_link(Some(Ipv4Addr::new(10, 0, 0, 7)));
    dev.distance.set(Some(30));
    dev.run_for(2_000);
    assert!(dev.app.door_status().open);

    dev.board
        .notifier
        .inject_message("My Garage/IN/STATE", "close");
    dev.step();
    assert!(dev.app.alarm_armed());
    assert_eq!(dev.relay.rises.get(), 0);

    dev.run_for(6_000);
    assert_eq!(dev.relay.rises.get(), 1);
    assert!(dev.tones.borrow().contains(&1_000));

    // 1 s pulse, then released.
    dev.run_for(1_500);
    assert!(!dev.relay.level.get());
    assert!(!dev.board.hw.relay_closed());
}

#[test]
fn lost_link_reboots_simulated_board() {
    let mut dev = SimDevice::boot(station_options());
    dev.step();
    dev.board.wifi.set_sim_link(Some(Ipv4Addr::new(10, 0, 0, 7)));
    dev.run_for(1_000);

    dev.board.wifi.set_sim_link(None);
    dev.run_for(30_000);
    assert!(!dev.board.restarted);
    dev.run_for(32_000);
    assert!(dev.board.restarted);
}
