// Message types exchanged over the bus

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Command from teleop/planners -> bridge
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Linear speed, m/s
    pub linear: f64,
    /// Angular speed, rad/s
    pub angular: f64,
}

/// Unit quaternion for a planar heading: rotation about +Z only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Quaternion for a heading angle in radians (planar motion, x = y = 0)
    pub fn from_heading(theta: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: (theta / 2.0).sin(),
            w: (theta / 2.0).cos(),
        }
    }
}

/// Pose and velocity reconstructed from one controller telemetry line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdometryReport {
    /// Position, meters
    pub x: f64,
    pub y: f64,
    /// Heading, radians
    pub theta: f64,
    /// Linear velocity, m/s
    pub vx: f64,
    /// Angular velocity, rad/s
    pub omega: f64,
    pub orientation: Quaternion,
    /// Microseconds since the unix epoch at reconstruction time
    pub stamp_us: u64,
    pub frame_id: String,
    pub child_frame_id: String,
}

/// Transform broadcast accompanying each odometry report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformUpdate {
    /// Translation (x, y, z), meters
    pub translation: [f64; 3],
    pub rotation: Quaternion,
    pub stamp_us: u64,
    pub child_frame_id: String,
    pub parent_frame_id: String,
}

/// Everything the dispatcher hands to the bus side for publication
#[derive(Debug, Clone)]
pub enum BusEvent {
    Odometry(OdometryReport),
    Transform(TransformUpdate),
    /// Raw received line echoed with its sequence number
    Diagnostic(String),
}

/// Current wall-clock time as microseconds since the unix epoch
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
