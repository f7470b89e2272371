// Gateway to a microcontroller-driven differential-drive base
//
// Velocity commands and PID-gain requests from the zenoh bus are encoded
// into fixed-point ASCII lines for the controller; telemetry lines coming
// back are reconstructed into odometry updates and re-published.

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod link;
pub mod messages;
pub mod runtime;
