//! Garage controller firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   WifiAdapter   Notifier     SntpTimeSource   │
//! │  (Sensor+Actuator) (Network)     (Notifier)   (TimeSource)     │
//! │        └──────────────┴── Board ──┴──────────────┘             │
//! │  NvsAdapter (Config)  RingLog (EventLog)  LogEventSink (Sink)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Lifecycle FSM · Clock · Door · Automation · Alarm     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::wifi::EspWifi;

use garagectl::adapters::board::Board;
use garagectl::adapters::device_id;
use garagectl::adapters::event_log::RingLog;
use garagectl::adapters::hardware::{HardwareAdapter, LedcBuzzer, NoClimateSensor};
use garagectl::adapters::log_sink::LogEventSink;
use garagectl::adapters::notifier::Notifier;
use garagectl::adapters::nvs::NvsAdapter;
use garagectl::adapters::time::{Esp32TimeAdapter, SntpTimeSource};
use garagectl::adapters::wifi::WifiAdapter;
use garagectl::app::commands::{parse_broker_message, AppCommand, Auth};
use garagectl::app::service::AppService;
use garagectl::config::OptionKey;
use garagectl::drivers::hw_init;
use garagectl::drivers::inputs::{Button, DoorSwitch};
use garagectl::drivers::relay::Relay;
use garagectl::drivers::status_led::StatusLedPin;
use garagectl::drivers::ultrasonic::Ultrasonic;
use garagectl::drivers::watchdog::Watchdog;

/// Pause between loop passes.
const LOOP_PERIOD_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  garagectl v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    if let Err(e) = hw_init::init_peripherals() {
        // The buzzer is the only LEDC user; carry on without it.
        warn!("HAL init failed: {}", e);
    }
    let watchdog = Watchdog::new();

    // ── 2. Options from NVS (or defaults) ─────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let options = nvs.load_or_default();

    // ── 3. Pins ───────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    let relay = Relay::new(PinDriver::output(pins.gpio15)?);
    let led = StatusLedPin::new(PinDriver::output(pins.gpio2)?);

    let mut button_pin = PinDriver::input(pins.gpio0)?;
    button_pin.set_pull(Pull::Up)?;
    let mut switch_pin = PinDriver::input(pins.gpio4)?;
    switch_pin.set_pull(Pull::Up)?;

    let sonar = Ultrasonic::new(
        PinDriver::output(pins.gpio12)?,
        PinDriver::input(pins.gpio14)?,
        Ets,
        hw_init::micros,
    );

    let hw = HardwareAdapter::new(
        relay,
        led,
        Button::new(button_pin),
        DoorSwitch::new(switch_pin),
        Box::new(sonar),
        Box::new(NoClimateSensor),
        Box::new(LedcBuzzer),
    );

    // ── 4. Radio, notifier, time ──────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let wifi = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, None)?);
    let notifier = Notifier::new(&options);
    let mut board = Board::new(hw, wifi, notifier, SntpTimeSource::start());

    let mac = device_id::read_mac();
    let identity = device_id::identity(&mac);
    info!("Device: {} ({})", identity.host_name, identity.mac);

    let time = Esp32TimeAdapter::new();
    let mut event_log = RingLog::new(options.int(OptionKey::Lsz) as usize);
    let mut sink = LogEventSink::new();

    // ── 5. Application core ───────────────────────────────────
    let mut app = AppService::new(options, identity);
    app.start(&mut sink);

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        let now_ms = time.uptime_ms();
        app.tick(now_ms, &mut board, &nvs, &mut event_log, &mut sink);

        // Broker requests are trusted door commands.
        while let Some(msg) = board.notifier.take_message() {
            let parsed = parse_broker_message(
                app.options().str(OptionKey::Name),
                &msg.topic,
                &msg.payload,
            );
            let Some(door) = parsed else {
                continue;
            };
            if let Err(e) = app.handle_command(
                AppCommand::Door(door),
                &Auth::Trusted,
                now_ms,
                &mut board,
                &nvs,
                &mut event_log,
                &mut sink,
            ) {
                warn!("Broker command {:?} rejected: {}", door, e);
            }
        }

        refresh_adapters(&app, &mut board, &mut event_log);

        watchdog.feed();
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}

/// Push option values that adapters cache (device name, webhook key,
/// log size) back into them.
fn refresh_adapters<H>(app: &AppService, board: &mut Board<H>, log: &mut RingLog) {
    let options = app.options();
    board.notifier.configure(options);
    let lsz = options.int(OptionKey::Lsz) as usize;
    if lsz != log.capacity() {
        log.set_capacity(lsz);
    }
}
