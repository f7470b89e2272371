// Topics, frames, defaults, and the parameter store

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

// Zenoh topics
pub const TOPIC_CMD_VEL: &str = "diffdrive/cmd/vel"; // velocity commands
pub const TOPIC_ODOM: &str = "diffdrive/rt/odom"; // odometry reports
pub const TOPIC_TF: &str = "diffdrive/rt/tf"; // odom -> base_link transform
pub const TOPIC_SERIAL: &str = "diffdrive/rt/serial"; // diagnostic line echo
pub const TOPIC_SET_GAINS: &str = "diffdrive/srv/drive_gains"; // set-gains queryable

// Frames for the odometry transform
pub const FRAME_ODOM: &str = "odom";
pub const FRAME_BASE_LINK: &str = "base_link";

// Serial link defaults
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Wheel geometry for the controller's dead-reckoning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdomParams {
    /// Wheel diameter, meters
    pub wheel_diameter: f64,
    /// Distance between wheel contact points, meters
    pub track_width: f64,
    /// Encoder counts per wheel revolution
    pub counts_per_revolution: i64,
}

impl Default for OdomParams {
    fn default() -> Self {
        Self {
            wheel_diameter: 0.0,
            track_width: 0.0,
            counts_per_revolution: 0,
        }
    }
}

/// PI controller coefficients for wheel velocity and turning
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveGains {
    pub velocity_p: f64,
    pub velocity_i: f64,
    pub turn_p: f64,
    pub turn_i: f64,
}

/// Battery monitor thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryParams {
    /// Volts; the controller raises a low-battery alarm below this
    pub voltage_too_low_limit: f64,
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            voltage_too_low_limit: 12.0,
        }
    }
}

/// Top-level bridge configuration, loadable from a JSON file.
/// Every field has a default, so a partial (or absent) file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    pub odometry: OdomParams,
    pub gains: DriveGains,
    pub battery: BatteryParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}

/// Runtime parameter store backing the controller init requests.
///
/// Odometry and battery parameters are fixed after startup. Drive gains can
/// be rewritten by a set-gains request; the mutex keeps that read-modify-write
/// atomic with respect to concurrent reads, so the persisted copy never
/// diverges from what was last sent to the controller.
#[derive(Debug)]
pub struct ParamStore {
    odometry: OdomParams,
    battery: BatteryParams,
    gains: Mutex<DriveGains>,
}

impl ParamStore {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            odometry: config.odometry.clone(),
            battery: config.battery,
            gains: Mutex::new(config.gains),
        }
    }

    pub fn odom_params(&self) -> OdomParams {
        self.odometry.clone()
    }

    pub fn battery_params(&self) -> BatteryParams {
        self.battery
    }

    pub fn drive_gains(&self) -> DriveGains {
        match self.gains.lock() {
            Ok(gains) => *gains,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_drive_gains(&self, gains: DriveGains) {
        match self.gains.lock() {
            Ok(mut slot) => *slot = gains,
            Err(poisoned) => *poisoned.into_inner() = gains,
        }
    }
}
