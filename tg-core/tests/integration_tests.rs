/*
 * Integration tests for thermgov
 *
 * Detection and the controller are run against synthetic sysfs trees
 * built in a temporary directory.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tg_core::{
    ControllerConfig, ControllerState, DetectionPolicy, DeviceSelector, PwmRange,
    TemperatureController, ThermgovError,
};

// Test utilities
struct SysfsTree {
    dir: tempfile::TempDir,
}

impl SysfsTree {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("hwmon")).unwrap();
        fs::create_dir(dir.path().join("thermal")).unwrap();
        Self { dir }
    }

    fn hwmon(&self) -> PathBuf {
        self.dir.path().join("hwmon")
    }

    fn thermal(&self) -> PathBuf {
        self.dir.path().join("thermal")
    }

    fn policy(&self) -> DetectionPolicy {
        DetectionPolicy::new().unwrap().with_roots(self.hwmon(), self.thermal())
    }

    fn chip(&self, entry: &str, name: &str) -> PathBuf {
        let chip = self.hwmon().join(entry);
        fs::create_dir_all(&chip).unwrap();
        fs::write(chip.join("name"), format!("{}\n", name)).unwrap();
        chip
    }

    fn temp(&self, chip: &Path, index: u32, millidegrees: i64, label: Option<&str>) -> PathBuf {
        let input = chip.join(format!("temp{}_input", index));
        fs::write(&input, format!("{}\n", millidegrees)).unwrap();
        if let Some(label) = label {
            fs::write(chip.join(format!("temp{}_label", index)), format!("{}\n", label)).unwrap();
        }
        input
    }

    fn pwm(&self, chip: &Path, index: u32, mode: i64) -> PathBuf {
        let pwm = chip.join(format!("pwm{}", index));
        fs::write(&pwm, "128\n").unwrap();
        fs::write(chip.join(format!("pwm{}_enable", index)), format!("{}\n", mode)).unwrap();
        pwm
    }

    fn zone(&self, entry: &str, content: &str) -> PathBuf {
        let zone = self.thermal().join(entry);
        fs::create_dir_all(&zone).unwrap();
        fs::write(zone.join("temp"), content).unwrap();
        zone
    }

    fn cooling(&self, entry: &str, device_type: &str, max_state: u32, cur_state: u32) -> PathBuf {
        let dev = self.thermal().join(entry);
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("type"), format!("{}\n", device_type)).unwrap();
        fs::write(dev.join("max_state"), format!("{}\n", max_state)).unwrap();
        fs::write(dev.join("cur_state"), format!("{}\n", cur_state)).unwrap();
        dev
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap().trim().to_string()
}

/// Boxed devices are not `Debug`, so `unwrap_err` is unavailable
fn expect_err<T>(result: Result<T, ThermgovError>) -> ThermgovError {
    match result {
        Err(e) => e,
        Ok(_) => panic!("expected an error"),
    }
}

// ============================================================================
// Sensor detection
// ============================================================================

#[test]
fn test_thermal_zone_preferred_over_hwmon() {
    let tree = SysfsTree::new();
    let chip = tree.chip("hwmon0", "coretemp");
    tree.temp(&chip, 1, 61000, Some("Package id 0"));
    tree.zone("thermal_zone0", "48000\n");

    let sensor = tree.policy().detect_sensor().unwrap();
    assert_eq!(sensor.read().unwrap(), 48.0);
    assert!(sensor.describe().contains("thermal_zone0"));
}

#[test]
fn test_unreadable_zone_falls_back_to_cpu_channel() {
    let tree = SysfsTree::new();
    tree.zone("thermal_zone0", "n/a\n");
    let nvme = tree.chip("hwmon0", "nvme");
    tree.temp(&nvme, 1, 35000, Some("Composite"));
    let core = tree.chip("hwmon1", "coretemp");
    tree.temp(&core, 1, 62000, Some("Package id 0"));
    tree.temp(&core, 2, 58000, Some("Core 0"));

    let sensor = tree.policy().detect_sensor().unwrap();
    assert_eq!(sensor.read().unwrap(), 62.0);
    assert!(sensor.describe().ends_with("hwmon1/temp1_input"));
}

#[test]
fn test_cpu_label_matches_generic_chip() {
    let tree = SysfsTree::new();
    let chip = tree.chip("hwmon0", "zenpower");
    tree.temp(&chip, 1, 40000, Some("Tdie"));
    tree.temp(&chip, 2, 45000, Some("Tccd1"));

    let sensor = tree.policy().detect_hwmon_sensor().unwrap();
    assert!(sensor.path().ends_with("temp2_input"));
}

#[test]
fn test_no_cpu_sensor_lists_candidates() {
    let tree = SysfsTree::new();
    let nvme = tree.chip("hwmon0", "nvme");
    tree.temp(&nvme, 1, 35000, Some("Composite"));
    tree.temp(&nvme, 2, 36000, Some("Sensor 1"));
    let gpu = tree.chip("hwmon1", "amdgpu");
    tree.temp(&gpu, 1, 50000, Some("edge"));

    let err = expect_err(tree.policy().detect_sensor());
    match &err {
        ThermgovError::DeviceNotFound { candidates, .. } => {
            assert_eq!(candidates.len(), 3);
            assert!(candidates[0].starts_with("hwmon0/temp1_input (nvme - Composite)"));
            assert!(candidates[2].contains("amdgpu - edge"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("1. hwmon0/temp1_input"));
    assert!(err.is_construction());
}

#[test]
fn test_replaced_pattern_tables() {
    let tree = SysfsTree::new();
    let gpu = tree.chip("hwmon0", "amdgpu");
    tree.temp(&gpu, 1, 50000, Some("edge"));

    let policy = tree
        .policy()
        .with_cpu_device_patterns(&["amdgpu"])
        .unwrap();
    assert_eq!(policy.detect_sensor().unwrap().read().unwrap(), 50.0);
}

// ============================================================================
// Actuator detection
// ============================================================================

#[test]
fn test_fan_cooling_device_preferred() {
    let tree = SysfsTree::new();
    tree.cooling("cooling_device0", "Processor", 10, 0);
    tree.cooling("cooling_device1", "Fan", 1, 0);

    let actuator = tree.policy().detect_actuator(PwmRange::default()).unwrap();
    assert!(actuator.describe().contains("cooling_device1"));
    assert_eq!(actuator.min_speed(), 0);
    assert_eq!(actuator.max_speed(), 255);
    actuator.close().unwrap();
}

#[test]
fn test_non_fan_cooling_devices_fall_through_to_pwm() {
    let tree = SysfsTree::new();
    let processor = tree.cooling("cooling_device0", "Processor", 10, 0);
    let powerclamp = tree.cooling("cooling_device1", "intel_powerclamp", 50, 0);
    let board = tree.chip("hwmon0", "nct6775");
    let pwm = tree.pwm(&board, 1, 2);

    assert!(matches!(
        tree.policy().detect_cooling_device(),
        Err(ThermgovError::MalformedDevice { .. })
    ));

    let actuator = tree.policy().detect_actuator(PwmRange::default()).unwrap();
    assert!(actuator.describe().ends_with("hwmon0/pwm1"));
    assert_eq!(read(&board.join("pwm1_enable")), "1");

    actuator.set_speed(255).unwrap();
    assert_eq!(read(&pwm), "255");
    assert_eq!(read(&processor.join("cur_state")), "0");
    assert_eq!(read(&powerclamp.join("cur_state")), "0");

    actuator.close().unwrap();
    assert_eq!(read(&board.join("pwm1_enable")), "2");
}

#[test]
fn test_explicit_non_fan_cooling_device_rejected() {
    let tree = SysfsTree::new();
    let processor = tree.cooling("cooling_device0", "Processor", 10, 4);

    let selector = DeviceSelector::path(&processor).unwrap();
    let err = expect_err(tree.policy().actuator(&selector, PwmRange::default()));
    assert!(matches!(err, ThermgovError::MalformedDevice { .. }));
    assert_eq!(read(&processor.join("cur_state")), "4");
}

#[test]
fn test_pwm_fallback_skips_non_fan_chips() {
    let tree = SysfsTree::new();
    let gpu = tree.chip("hwmon0", "amdgpu");
    let gpu_pwm = tree.pwm(&gpu, 1, 2);
    let board = tree.chip("hwmon1", "nct6775");
    let board_pwm = tree.pwm(&board, 2, 5);

    let actuator = tree.policy().detect_actuator(PwmRange::default()).unwrap();
    assert!(actuator.describe().ends_with("hwmon1/pwm2"));
    assert_eq!(read(&board.join("pwm2_enable")), "1");
    assert_eq!(read(&gpu.join("pwm1_enable")), "2");

    actuator.set_speed(10).unwrap();
    assert_eq!(read(&board_pwm), "50");
    assert_eq!(read(&gpu_pwm), "128");

    actuator.close().unwrap();
    assert_eq!(read(&board.join("pwm2_enable")), "5");
}

#[test]
fn test_no_actuator_lists_pwm_candidates() {
    let tree = SysfsTree::new();
    let gpu = tree.chip("hwmon0", "amdgpu");
    tree.pwm(&gpu, 1, 2);

    let err = expect_err(tree.policy().detect_actuator(PwmRange::default()));
    assert!(matches!(
        &err,
        ThermgovError::DeviceNotFound { candidates, .. } if candidates.len() == 1
    ));
}

#[test]
fn test_empty_tree_finds_nothing() {
    let tree = SysfsTree::new();
    let policy = tree.policy();
    assert!(matches!(policy.detect_sensor(), Err(ThermgovError::DeviceNotFound { .. })));
    assert!(matches!(
        policy.detect_actuator(PwmRange::default()),
        Err(ThermgovError::DeviceNotFound { .. })
    ));
}

// ============================================================================
// Explicit selectors
// ============================================================================

#[test]
fn test_explicit_selectors() {
    let tree = SysfsTree::new();
    let chip = tree.chip("hwmon3", "it8728");
    let input = tree.temp(&chip, 4, 33000, None);
    let pwm = tree.pwm(&chip, 3, 2);
    let zone = tree.zone("thermal_zone7", "39000\n");
    let policy = tree.policy();

    let sensor = policy.sensor(&DeviceSelector::path(&input).unwrap()).unwrap();
    assert_eq!(sensor.read().unwrap(), 33.0);
    let sensor = policy.sensor(&DeviceSelector::path(&zone).unwrap()).unwrap();
    assert_eq!(sensor.read().unwrap(), 39.0);

    let actuator = policy
        .actuator(&DeviceSelector::path(&pwm).unwrap(), PwmRange::new(0, 255).unwrap())
        .unwrap();
    actuator.set_speed(0).unwrap();
    assert_eq!(read(&pwm), "0");
    actuator.close().unwrap();

    assert!("hwmon3/pwm3".parse::<DeviceSelector>().is_err());
    let missing = DeviceSelector::path(tree.hwmon().join("hwmon9/pwm1")).unwrap();
    assert!(matches!(
        policy.actuator(&missing, PwmRange::default()),
        Err(ThermgovError::InvalidPath { .. })
    ));
}

// ============================================================================
// Inventory
// ============================================================================

#[test]
fn test_inventory_flags_matches() {
    let tree = SysfsTree::new();
    let core = tree.chip("hwmon0", "k10temp");
    tree.temp(&core, 1, 55000, Some("Tctl"));
    let gpu = tree.chip("hwmon1", "amdgpu");
    tree.temp(&gpu, 1, 44000, Some("edge"));
    tree.pwm(&gpu, 1, 2);
    tree.zone("thermal_zone0", "41000\n");
    tree.cooling("cooling_device0", "Fan", 1, 0);

    let inventory = tree.policy().inventory();
    assert_eq!(inventory.thermal_zones.len(), 1);
    assert_eq!(inventory.thermal_zones[0].current_temp, Some(41.0));
    assert_eq!(inventory.cooling_devices.len(), 1);
    assert!(inventory.cooling_devices[0].matches);
    assert_eq!(inventory.cooling_devices[0].max_state, Some(1));

    assert_eq!(inventory.temp_channels.len(), 2);
    assert!(inventory.temp_channels[0].matches);
    assert_eq!(inventory.temp_channels[0].current_temp, Some(55.0));
    assert!(!inventory.temp_channels[1].matches);

    assert_eq!(inventory.pwm_channels.len(), 1);
    assert!(!inventory.pwm_channels[0].matches);
    assert_eq!(inventory.pwm_channels[0].current_value, Some(128));
    // Listing must not acquire anything
    assert_eq!(read(&gpu.join("pwm1_enable")), "2");
}

// ============================================================================
// Controller
// ============================================================================

#[test]
fn test_inverted_thresholds_rejected_before_devices() {
    let err = ControllerConfig::new(75.0, 40.0, Duration::from_secs(5), false).unwrap_err();
    assert!(matches!(err, ThermgovError::InvalidConfig { .. }));
    assert!(PwmRange::new(200, 100).is_err());
}

#[tokio::test]
async fn test_autodetected_controller_restores_cooling_state() {
    let tree = SysfsTree::new();
    tree.zone("thermal_zone0", "57500\n");
    let fan = tree.cooling("cooling_device0", "Fan", 4, 1);

    let config = ControllerConfig::new(40.0, 75.0, Duration::from_millis(20), true).unwrap();
    let mut controller = TemperatureController::autodetect(
        config,
        &DeviceSelector::Auto,
        &DeviceSelector::Auto,
        PwmRange::default(),
        &tree.policy(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    controller.start(shutdown_rx).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 57.5°C on 0..=255 -> 127 -> round(127 * 4 / 255) = 2
    assert_eq!(read(&fan.join("cur_state")), "2");

    shutdown_tx.send(true).unwrap();
    controller.stop();
    tokio::time::timeout(Duration::from_secs(2), controller.join())
        .await
        .unwrap();
    assert_eq!(controller.state(), ControllerState::Stopped);

    controller.release().unwrap();
    assert_eq!(read(&fan.join("cur_state")), "1");
}

#[test]
fn test_autodetect_fails_without_actuator() {
    let tree = SysfsTree::new();
    tree.zone("thermal_zone0", "50000\n");

    let err = TemperatureController::autodetect(
        ControllerConfig::default(),
        &DeviceSelector::Auto,
        &DeviceSelector::Auto,
        PwmRange::default(),
        &tree.policy(),
    )
    .unwrap_err();
    assert!(matches!(err, ThermgovError::DeviceNotFound { .. }));
}
