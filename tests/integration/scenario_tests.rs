//! End-to-end scenarios: monitor and controller sharing one status file,
//! as `pcpower monitor` and a one-shot `pcpower on` would.

use std::sync::Arc;
use std::time::Duration;

use crate::mock_hw::{MockGpio, RecordingSink, wait_until};

use pcpower::adapters::status_file::StatusFile;
use pcpower::app::ports::StatusStore;
use pcpower::config::SystemConfig;
use pcpower::{PowerController, PowerStatus, StatusMonitor};

const STATUS: u32 = 22;
const BUZZER: u32 = 23;
const POWER: u32 = 17;
const SETTLE: Duration = Duration::from_secs(2);

fn config(dir: &tempfile::TempDir) -> SystemConfig {
    SystemConfig {
        status_file: dir.path().join("run/pcpower/power_status"),
        power_on_hold_ms: 200,
        power_off_hold_ms: 400,
        reboot_hold_ms: 200,
        ..SystemConfig::default()
    }
}

#[test]
fn boot_observe_on_then_power_on_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let mut gpio = MockGpio::new();

    // Separate store handles, like separate processes.
    let monitor_store = Arc::new(StatusFile::new(&config.status_file));
    let reader = Arc::new(StatusFile::new(&config.status_file));

    let controller = PowerController::new(
        &mut gpio,
        &config,
        reader.clone(),
        Arc::new(RecordingSink::new()),
    )
    .unwrap();
    assert_eq!(controller.last_status(), PowerStatus::Unknown);

    gpio.set_level(STATUS, true);
    let mut monitor = StatusMonitor::start(
        &mut gpio,
        &config,
        monitor_store,
        Arc::new(RecordingSink::new()),
    )
    .unwrap();
    assert!(wait_until(SETTLE, || controller.last_status() == PowerStatus::PoweredOn));

    let result = controller.power_on();
    assert_eq!(
        result.to_json(),
        r#"{"command_status":"ERROR","message":"Power On Command NOT Sent: PC Power State Powered On"}"#
    );
    assert_eq!(gpio.levels(POWER), vec![true]);

    monitor.shutdown();
    controller.shutdown();
}

#[test]
fn power_cycle_through_the_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let mut gpio = MockGpio::new();
    let store = Arc::new(StatusFile::new(&config.status_file));

    let mut monitor =
        StatusMonitor::start(&mut gpio, &config, store.clone(), Arc::new(RecordingSink::new()))
            .unwrap();
    let controller =
        PowerController::new(&mut gpio, &config, store.clone(), Arc::new(RecordingSink::new()))
            .unwrap();

    assert!(wait_until(SETTLE, || controller.last_status() == PowerStatus::PoweredOff));
    assert!(controller.power_on().is_success());

    // The machine comes up.
    gpio.set_level(STATUS, true);
    assert!(wait_until(SETTLE, || controller.last_status() == PowerStatus::PoweredOn));
    assert!(!controller.power_on().is_success());
    assert!(controller.reboot().is_success());

    // POST beeps while it reboots.
    gpio.pulse(BUZZER);
    gpio.pulse(BUZZER);
    assert!(wait_until(SETTLE, || store.read().buzzer_pulse_count == 2));
    assert_eq!(store.read().status, PowerStatus::PoweredOn);

    assert!(controller.power_off().is_success());
    gpio.set_level(STATUS, false);
    assert!(wait_until(SETTLE, || controller.last_status() == PowerStatus::PoweredOff));

    monitor.shutdown();
    assert!(!config.status_file.exists());
    assert_eq!(controller.last_status(), PowerStatus::Unknown);
    assert!(!controller.power_on().is_success());
    controller.shutdown();
}
