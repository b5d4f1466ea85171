//! Connectivity lifecycle driven through the service against mock ports:
//! provisioning, association timeouts, link loss and the reset paths.

use crate::mock_hw::{HwCall, Rig};

use garagectl::adapters::device_id;
use garagectl::app::commands::{AppCommand, Auth};
use garagectl::app::events::AppEvent;
use garagectl::app::ports::{EndpointSet, EventLogPort};
use garagectl::config::{DeviceMode, OptionKey, Options};
use garagectl::door::LogEntry;
use garagectl::fsm::StateId;

fn station_options() -> Options {
    let mut o = Options::default();
    o.set_device_mode(DeviceMode::Station);
    o.set_str(OptionKey::Ssid, "home");
    o.set_str(OptionKey::Pass, "hunter22");
    o
}

// ── Access point provisioning ─────────────────────────────────

#[test]
fn access_point_mode_starts_portal() {
    let mut rig = Rig::new(Options::default());
    assert_eq!(rig.sink.events[0], AppEvent::Started(StateId::Initial));
    rig.tick();

    let ssid = device_id::ap_ssid(&device_id::read_mac());
    assert_eq!(rig.app.state(), StateId::Connected);
    assert_eq!(
        rig.hw.calls[..3],
        [
            HwCall::StartAp(ssid.as_str().to_owned()),
            HwCall::CaptiveDns,
            HwCall::Endpoints(EndpointSet::AccessPoint),
        ]
    );
    // No pipeline in AP mode.
    rig.run_for(5_000);
    assert_eq!(rig.app.door_status().read_count, 0);
}

#[test]
fn provisioning_persists_station_mode_then_reboots_once() {
    let mut rig = Rig::new(Options::default());
    rig.tick();

    rig.command(
        AppCommand::SwitchNetwork {
            ssid: "home".into(),
            pass: "hunter22".into(),
            auth: None,
        },
        &Auth::None,
    )
    .unwrap();
    assert_eq!(rig.app.state(), StateId::TryConnect);
    let stored = rig.store.stored().unwrap();
    assert_eq!(stored.str(OptionKey::Ssid), "home");
    assert_eq!(stored.device_mode(), DeviceMode::AccessPoint);

    // The attempt keeps the portal up and lands in Connected regardless.
    rig.step();
    assert_eq!(rig.app.state(), StateId::Connected);
    assert!(rig.hw.calls.contains(&HwCall::BeginStation {
        ssid: "home".into(),
        keep_ap: true
    }));

    rig.hw.link_up();
    rig.step();
    assert_eq!(rig.app.state(), StateId::WaitRestart);
    assert_eq!(rig.store.stored().unwrap().device_mode(), DeviceMode::Station);

    rig.run_for(9_900);
    assert_eq!(rig.hw.restarts(), 0, "reboot waits for the response grace");
    rig.step();
    assert_eq!(rig.hw.restarts(), 1);

    rig.run_for(5_000);
    assert_eq!(rig.hw.restarts(), 1);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::Rebooting), 1);
}

#[test]
fn provisioning_stores_cloud_token_when_given() {
    let mut rig = Rig::new(Options::default());
    rig.tick();
    rig.command(
        AppCommand::SwitchNetwork {
            ssid: "home".into(),
            pass: "".into(),
            auth: Some("tok-123".into()),
        },
        &Auth::None,
    )
    .unwrap();
    assert_eq!(rig.app.options().str(OptionKey::Auth), "tok-123");
}

// ── Station mode ──────────────────────────────────────────────

#[test]
fn station_association_brings_up_services() {
    let rig = Rig::station(Options::default());
    let host = device_id::identity(&device_id::read_mac()).host_name;
    assert!(rig.hw.calls.contains(&HwCall::BeginStation {
        ssid: "home".into(),
        keep_ap: false
    }));
    assert!(rig.hw.calls.contains(&HwCall::Endpoints(EndpointSet::Station)));
    assert!(rig.hw.calls.contains(&HwCall::NameService(host)));
    // No broker configured: no connect attempt.
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::ConnectBroker(_))), 0);
}

#[test]
fn association_timeout_reboots_once() {
    let mut rig = Rig::new(station_options());
    rig.tick();
    assert_eq!(rig.app.state(), StateId::Connecting);

    rig.run_for(60_000);
    assert_eq!(rig.app.state(), StateId::Connecting);
    assert_eq!(rig.hw.restarts(), 0);

    rig.run_for(5_000);
    assert_eq!(rig.app.state(), StateId::WaitRestart);
    assert_eq!(rig.hw.restarts(), 1);
}

#[test]
fn link_loss_over_61s_reboots_exactly_once() {
    let mut rig = Rig::station(Options::default());
    rig.run_for(1_000);

    rig.hw.link_down();
    rig.run_for(61_000 + 5_000);

    assert_eq!(rig.hw.restarts(), 1);
    assert_eq!(rig.app.state(), StateId::WaitRestart);
}

#[test]
fn link_restored_within_grace_keeps_running() {
    let mut rig = Rig::station(Options::default());
    rig.run_for(1_000);

    rig.hw.link_down();
    rig.run_for(30_000);
    let samples_while_down = rig.app.door_status().read_count;
    rig.hw.link_up();
    rig.run_for(40_000);

    assert_eq!(rig.hw.restarts(), 0);
    assert_eq!(rig.app.state(), StateId::Connected);
    assert_ne!(rig.app.door_status().read_count, samples_while_down);
}

// ── Reset paths ───────────────────────────────────────────────

#[test]
fn factory_reset_wipes_then_reboots() {
    let mut rig = Rig::station(Options::default());
    rig.log
        .append(&LogEntry {
            tstamp: 1_700_000_000,
            open: true,
            distance: 30,
        })
        .unwrap();

    rig.keyed(AppCommand::FactoryReset).unwrap();
    assert_eq!(rig.app.state(), StateId::Reset);

    rig.step();
    assert_eq!(rig.store.erases.get(), 1);
    assert!(rig.log.is_empty());
    assert_eq!(rig.app.options(), &Options::default());
    assert_eq!(rig.hw.restarts(), 0);

    rig.step();
    assert_eq!(rig.hw.restarts(), 1);
    rig.run_for(2_000);
    assert_eq!(rig.hw.restarts(), 1);
}

#[test]
fn factory_reset_while_reboot_pending_is_ignored() {
    let mut rig = Rig::station(Options::default());
    rig.keyed(AppCommand::Reboot).unwrap();
    rig.keyed(AppCommand::FactoryReset).unwrap();
    assert_eq!(rig.app.state(), StateId::WaitRestart);
    rig.run_for(2_000);
    assert_eq!(rig.store.erases.get(), 0);
    assert_eq!(rig.hw.restarts(), 1);
}

#[test]
fn reboot_request_drains_one_second() {
    let mut rig = Rig::station(Options::default());
    rig.keyed(AppCommand::Reboot).unwrap();
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::RebootScheduled { delay_ms: 1_000 }));

    rig.run_for(800);
    assert_eq!(rig.hw.restarts(), 0);
    rig.run_for(400);
    assert_eq!(rig.hw.restarts(), 1);
}

#[test]
fn reset_to_ap_persists_mode_and_reboots() {
    let mut rig = Rig::station(Options::default());
    rig.keyed(AppCommand::ResetToAp).unwrap();
    assert_eq!(
        rig.store.stored().unwrap().device_mode(),
        DeviceMode::AccessPoint
    );
    rig.step();
    assert_eq!(rig.hw.restarts(), 1);
}

// ── Front-panel button ────────────────────────────────────────

#[test]
fn short_press_clicks_relay() {
    let mut rig = Rig::station(Options::default());
    rig.hw.button = true;
    rig.run_for(300);
    rig.hw.button = false;
    rig.step();
    assert_eq!(rig.hw.calls.iter().filter(|c| **c == HwCall::ClickRelay { pulse_ms: 1_000 }).count(), 1);
}

#[test]
fn medium_press_reports_ip_as_tones() {
    let mut rig = Rig::station(Options::default());
    rig.hw.button = true;
    rig.run_for(1_500);
    rig.hw.button = false;
    rig.run_for(30_000);
    assert_eq!(rig.hw.clicks(), 0);
    assert!(rig.hw.count(|c| matches!(c, HwCall::Tone(hz) if *hz > 0)) > 0);
}

#[test]
fn six_second_hold_resets_to_ap() {
    let mut rig = Rig::station(Options::default());
    rig.hw.button = true;
    rig.run_for(6_000);
    assert!(rig.hw.calls.contains(&HwCall::Led(true)), "LED solid past 5 s");
    rig.hw.button = false;
    rig.step();

    assert_eq!(
        rig.store.stored().unwrap().device_mode(),
        DeviceMode::AccessPoint
    );
    rig.step();
    assert_eq!(rig.hw.restarts(), 1);
    assert_eq!(rig.store.erases.get(), 0);
}

#[test]
fn eleven_second_hold_factory_resets() {
    let mut rig = Rig::station(Options::default());
    rig.hw.button = true;
    rig.run_for(11_000);
    rig.hw.button = false;
    rig.step();
    rig.step();
    assert_eq!(rig.store.erases.get(), 1);
    rig.step();
    assert_eq!(rig.hw.restarts(), 1);
}
