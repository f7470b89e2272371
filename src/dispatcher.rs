// Line protocol dispatcher for the drive controller link
//
// One instance owns all protocol traffic: inbound telemetry lines are
// classified by their leading token and turned into bus events; velocity and
// set-gains requests from the bus are encoded into outbound lines. Inbound
// lines arrive one at a time, so there is no locking here beyond the
// parameter store's own.

use std::num::ParseFloatError;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::{DriveGains, FRAME_BASE_LINK, FRAME_ODOM, ParamStore};
use crate::messages::{
    BusEvent, OdometryReport, Quaternion, TransformUpdate, VelocityCommand, now_micros,
};

/// Known leading tokens on inbound lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InboundKind {
    /// Odometry telemetry: `o\t<x>\t<y>\t<theta>\t<vx>\t<omega>`
    Odometry,
    /// Controller requests its odometry parameters after (re)boot
    InitOdomParams,
    /// Controller requests its PID gains
    InitGains,
    /// Controller requests its battery monitor threshold
    InitBattery,
    Unknown,
}

impl InboundKind {
    fn classify(token: &str) -> Self {
        match token {
            "o" => Self::Odometry,
            "InitializeDifferentialDriveOdomParams" => Self::InitOdomParams,
            "InitializeDifferentialDriveGains" => Self::InitGains,
            "InitializeBatteryMonitor" => Self::InitBattery,
            _ => Self::Unknown,
        }
    }
}

pub struct Dispatcher {
    params: Arc<ParamStore>,
    events: UnboundedSender<BusEvent>,
    serial_tx: UnboundedSender<String>,
    /// Lines received since startup, for the diagnostic echo
    counter: u64,
}

impl Dispatcher {
    pub fn new(
        params: Arc<ParamStore>,
        events: UnboundedSender<BusEvent>,
        serial_tx: UnboundedSender<String>,
    ) -> Self {
        Self {
            params,
            events,
            serial_tx,
            counter: 0,
        }
    }

    /// Process one received line, already stripped of its terminator
    pub fn handle_line(&mut self, line: &str) {
        self.counter += 1;
        // Echo everything we receive, before dispatch, so dropped lines
        // remain visible on the bus
        self.emit(BusEvent::Diagnostic(format!("{} {}", self.counter, line)));

        if line.is_empty() {
            return;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        match InboundKind::classify(parts[0]) {
            InboundKind::Odometry => self.broadcast_odometry(&parts),
            InboundKind::InitOdomParams => self.send_odom_params(),
            InboundKind::InitGains => {
                let gains = self.params.drive_gains();
                self.send_drive_gains(&gains);
            }
            InboundKind::InitBattery => self.send_battery_params(),
            InboundKind::Unknown => {}
        }
    }

    /// Encode and send a velocity command; the command itself is not retained
    pub fn handle_velocity_command(&mut self, command: &VelocityCommand) {
        info!(
            "Handling velocity command: {}, {}",
            command.linear, command.angular
        );
        self.send(codec::velocity_line(command.linear, command.angular));
    }

    /// Persist new drive gains, then send them to the controller.
    /// The store is written first so it can never diverge from the wire.
    pub fn handle_set_gains(&mut self, gains: &DriveGains) {
        self.params.set_drive_gains(*gains);
        self.send_drive_gains(gains);
    }

    /// Lines received since startup
    pub fn lines_received(&self) -> u64 {
        self.counter
    }

    fn broadcast_odometry(&mut self, parts: &[&str]) {
        if parts.len() < 6 {
            warn!("Dropping short odometry line ({} tokens)", parts.len());
            return;
        }

        // The catch boundary is deliberately confined to numeric parsing:
        // a garbled field drops this line only, nothing else is masked
        let fields = match parse_odometry_fields(&parts[1..6]) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Dropping malformed odometry line: {}", e);
                return;
            }
        };
        let [x, y, theta, vx, omega] = fields;

        let orientation = Quaternion::from_heading(theta);
        let stamp_us = now_micros();

        self.emit(BusEvent::Transform(TransformUpdate {
            translation: [x, y, 0.0],
            rotation: orientation,
            stamp_us,
            child_frame_id: FRAME_BASE_LINK.to_string(),
            parent_frame_id: FRAME_ODOM.to_string(),
        }));
        self.emit(BusEvent::Odometry(OdometryReport {
            x,
            y,
            theta,
            vx,
            omega,
            orientation,
            stamp_us,
            frame_id: FRAME_ODOM.to_string(),
            child_frame_id: FRAME_BASE_LINK.to_string(),
        }));
    }

    fn send_odom_params(&mut self) {
        let params = self.params.odom_params();
        self.send(codec::odom_params_line(&params));
    }

    fn send_drive_gains(&mut self, gains: &DriveGains) {
        self.send(codec::gains_line(gains));
    }

    fn send_battery_params(&mut self) {
        let params = self.params.battery_params();
        self.send(codec::battery_line(&params));
    }

    fn send(&mut self, line: String) {
        debug!("Sending: {:?}", line);
        if self.serial_tx.send(line).is_err() {
            warn!("Serial writer is gone, dropping outbound line");
        }
    }

    fn emit(&mut self, event: BusEvent) {
        if self.events.send(event).is_err() {
            warn!("Bus event receiver is gone, dropping event");
        }
    }
}

fn parse_odometry_fields(tokens: &[&str]) -> Result<[f64; 5], ParseFloatError> {
    Ok([
        tokens[0].parse()?,
        tokens[1].parse()?,
        tokens[2].parse()?,
        tokens[3].parse()?,
        tokens[4].parse()?,
    ])
}
