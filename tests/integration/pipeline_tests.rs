//! Station pipeline: sampling cadence, debounce, notifications, log,
//! automation closes, broker upkeep and the JSON views.

use crate::mock_hw::{HwCall, Rig, T0_UTC};

use garagectl::app::events::AppEvent;
use garagectl::app::ports::NotifyError;
use garagectl::config::{AUTO_CLOSE, AUTO_NOTIFY, OptionKey, Options};
use garagectl::door::DoorEvent;

/// Ceiling mount, threshold 50 cm.
const OPEN_CM: u32 = 30;
const CLOSED_CM: u32 = 200;

fn door_changes(rig: &Rig, wanted: DoorEvent) -> usize {
    rig.sink
        .count(|e| matches!(e, AppEvent::DoorChanged { event, .. } if *event == wanted))
}

fn with_broker(mut o: Options) -> Options {
    o.set_str(OptionKey::Mqtt, "broker.local");
    o
}

// ── Sampling ──────────────────────────────────────────────────

#[test]
fn samples_every_read_interval() {
    let mut rig = Rig::station(Options::default());
    rig.run_for(5_000);
    assert_eq!(rig.app.door_status().read_count, 10);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ClockSynced(T0_UTC)), 1);
    assert_eq!(rig.app.utc_seconds(), T0_UTC + 4);
}

#[test]
fn open_then_close_notifies_and_logs() {
    let mut rig = Rig::station(Options::default());
    rig.run_for(2_000);
    assert_eq!(rig.app.door_status().last_event, Some(DoorEvent::RemainClosed));

    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(2_000);
    assert_eq!(door_changes(&rig, DoorEvent::JustOpened), 1);
    assert!(rig.app.door_status().open);
    assert_eq!(rig.hw.notifications(), vec!["My Garage just OPENED!".to_owned()]);
    assert_eq!(rig.log.len(), 1);

    rig.hw.distance = Some(CLOSED_CM);
    rig.run_for(2_000);
    assert_eq!(door_changes(&rig, DoorEvent::JustClosed), 1);
    assert!(!rig.app.door_status().open);
    assert_eq!(rig.hw.notifications().len(), 2);
    assert_eq!(rig.hw.notifications()[1], "My Garage just CLOSED!");
    assert_eq!(rig.log.len(), 2);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::NotificationSent), 2);
}

#[test]
fn single_spurious_reading_is_ignored() {
    let mut rig = Rig::station(Options::default());
    rig.run_for(2_000);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(500);
    rig.hw.distance = Some(CLOSED_CM);
    rig.run_for(3_000);
    assert_eq!(door_changes(&rig, DoorEvent::JustOpened), 0);
    assert!(rig.hw.notifications().is_empty());
}

#[test]
fn failed_reads_repeat_last_reading() {
    let mut rig = Rig::station(Options::default());
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(3_000);
    assert!(rig.app.door_status().open);

    rig.hw.distance = None;
    rig.run_for(5_000);
    assert!(rig.app.door_status().open);
    assert_eq!(door_changes(&rig, DoorEvent::JustClosed), 0);
    assert_eq!(rig.app.door_status().last_event, Some(DoorEvent::RemainOpen));
}

#[test]
fn notify_failure_is_reported_not_retried() {
    let mut rig = Rig::station(Options::default());
    rig.hw.notify_result = Err(NotifyError::Transport("offline"));
    rig.run_for(1_000);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(3_000);

    assert_eq!(rig.hw.notifications().len(), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::NotificationFailed(_))),
        1
    );
    assert_eq!(rig.log.len(), 1, "log is written regardless");
}

#[test]
fn notify_flags_gate_messages() {
    let mut o = Options::default();
    o.set_int(OptionKey::Noto, 0);
    let mut rig = Rig::station(o);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(1_000);
    rig.hw.distance = Some(CLOSED_CM);
    rig.run_for(3_000);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(3_000);
    assert!(rig.hw.notifications().is_empty());
    assert_eq!(rig.log.len(), 2, "transitions are logged regardless");
}

// ── Automation ────────────────────────────────────────────────

#[test]
fn left_open_auto_close_goes_through_alarm() {
    let mut o = Options::default();
    o.set_int(OptionKey::Ati, 1);
    o.set_int(OptionKey::Ato, AUTO_CLOSE);
    let mut rig = Rig::station(o);
    rig.run_for(1_000);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(2_000);
    assert_eq!(rig.hw.clicks(), 0);

    rig.run_for(61_000);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::AlarmArmed { ticks: 11 }), 1);

    rig.run_for(6_000);
    assert_eq!(rig.hw.clicks(), 1);
    assert!(!rig.app.alarm_armed());
    assert!(rig.hw.calls.contains(&HwCall::Tone(1_000)));
    let last_tone = rig
        .hw
        .calls
        .iter()
        .rev()
        .find_map(|c| match c {
            HwCall::Tone(hz) => Some(*hz),
            _ => None,
        });
    assert_eq!(last_tone, Some(0));
}

#[test]
fn auto_close_with_alarm_off_still_sounds_five_seconds() {
    let mut o = Options::default();
    o.set_int(OptionKey::Ati, 1);
    o.set_int(OptionKey::Ato, AUTO_CLOSE | AUTO_NOTIFY);
    o.set_int(OptionKey::Alm, 0);
    let mut rig = Rig::station(o);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(64_000);

    assert_eq!(rig.sink.count(|e| *e == AppEvent::AlarmArmed { ticks: 11 }), 1);
    assert!(rig
        .hw
        .notifications()
        .iter()
        .any(|n| n.starts_with("My Garage is left open for more than 1 minutes.")));
}

#[test]
fn nothing_is_automated_or_logged_before_first_sync() {
    let mut o = Options::default();
    o.set_int(OptionKey::Ati, 1);
    o.set_int(OptionKey::Ato, AUTO_CLOSE | AUTO_NOTIFY);
    let mut rig = Rig::station_unsynced(o);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(3_000);
    assert!(rig.app.door_status().open);
    assert_eq!(rig.app.utc_seconds(), 0);
    assert!(rig.log.is_empty());

    rig.hw.utc = T0_UTC;
    rig.run_for(5_000);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ClockSynced(T0_UTC)), 1);
    assert!(rig.hw.notifications().is_empty());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AlarmArmed { .. })), 0);
    assert!(rig.log.is_empty(), "no entry stamped 0");

    // The open timer starts at the first synced sample.
    rig.run_for(50_000);
    assert!(rig.hw.notifications().is_empty());
    rig.run_for(10_000);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::AlarmArmed { ticks: 11 }), 1);
    assert!(rig
        .hw
        .notifications()
        .iter()
        .any(|n| n.starts_with("My Garage is left open for more than 1 minutes.")));
}

// ── Broker ────────────────────────────────────────────────────

#[test]
fn unreachable_broker_is_retried_every_50s() {
    let mut rig = Rig::station(with_broker(Options::default()));
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::ConnectBroker(_))), 1, "connect on association");

    rig.hw.broker_reachable = false;
    rig.hw.broker_up = false;
    rig.run_for(120_000);

    // First pipeline pass, then every 50 s of clock time.
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::ConnectBroker(_))), 4);
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::PublishState(_))), 0);
}

#[test]
fn connected_broker_gets_status_every_15s_and_on_transitions() {
    let mut rig = Rig::station(with_broker(Options::default()));
    assert!(rig.hw.broker_up);
    rig.run_for(31_000);
    assert_eq!(rig.hw.count(|c| *c == HwCall::PublishState(false)), 3);
    assert!(rig.hw.count(|c| *c == HwCall::KeepAlive) > 0);

    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(1_000);
    assert_eq!(rig.hw.count(|c| *c == HwCall::PublishState(true)), 1);
}

// ── Views ─────────────────────────────────────────────────────

#[test]
fn controller_view_reports_latest_sample() {
    let mut o = Options::default();
    o.set_int(OptionKey::Tsn, 1);
    let mut rig = Rig::station(o);
    rig.hw.climate = Some((21.5, 40.0));
    rig.run_for(2_000);

    let json = rig.app.controller_json(Some(-55));
    assert_eq!(json["dist"], CLOSED_CM);
    assert_eq!(json["door"], 0);
    assert_eq!(json["vehicle"], 0);
    assert_eq!(json["rcnt"], 4);
    assert_eq!(json["name"], "My Garage");
    assert_eq!(json["mac"], "DE:AD:BE:EF:CA:FE");
    assert_eq!(json["rssi"], -55);
    assert_eq!(json["temp"], 21.5);
    assert_eq!(json["humid"], 40.0);
}

#[test]
fn controller_view_omits_climate_without_sensor_option() {
    let mut rig = Rig::station(Options::default());
    rig.hw.climate = Some((21.5, 40.0));
    rig.run_for(1_000);
    let json = rig.app.controller_json(None);
    assert!(json.get("temp").is_none());
    assert_eq!(json["rssi"], 0);
}

#[test]
fn log_view_lists_transitions_oldest_first() {
    let mut rig = Rig::station(Options::default());
    rig.run_for(1_000);
    rig.hw.distance = Some(OPEN_CM);
    rig.run_for(2_000);
    rig.hw.distance = Some(CLOSED_CM);
    rig.run_for(2_000);

    let json = rig.app.log_json(&mut rig.log);
    assert_eq!(json["name"], "My Garage");
    let logs = json["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0][1], 1);
    assert_eq!(logs[0][2], OPEN_CM);
    assert_eq!(logs[1][1], 0);
    assert_eq!(logs[1][2], CLOSED_CM);
    let t0 = logs[0][0].as_u64().unwrap();
    let t1 = logs[1][0].as_u64().unwrap();
    assert!(t0 >= T0_UTC && t1 > t0);
}

#[test]
fn options_view_hides_secrets() {
    let rig = Rig::station(Options::default());
    let json = rig.app.options_json();
    assert!(json.get("pass").is_none());
    assert!(json.get("dkey").is_none());
    assert_eq!(json["ssid"], "home");
}
