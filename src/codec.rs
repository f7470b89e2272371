// Fixed-point ASCII codec for the drive controller link
//
// The microcontroller only accepts integers over the wire, so every float
// is sent as a (base, exponent) pair such that value ~= base * 10^exponent,
// with the base truncated to a fixed number of significant decimal digits.

use crate::config::{BatteryParams, DriveGains, OdomParams};

/// Significant decimal digits carried by an encoded base
pub const DEFAULT_RESOLUTION: i32 = 4;

/// A float broken into integers for transmission: `value ~= base * 10^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedNumber {
    pub base: i64,
    pub exponent: i32,
}

/// Encode a float as a (base, exponent) pair at the given resolution.
///
/// The base keeps `resolution` significant decimal digits (fewer if
/// truncation drops trailing digits); zero encodes as (0, 0).
///
/// The exponent comes from `floor(1 + log10(|value|))`. At exact powers of
/// ten this can land one off the intuitive digit count because of log10
/// rounding; the controller firmware decodes against exactly this formula,
/// so it must not be changed.
pub fn encode(value: f64, resolution: i32) -> EncodedNumber {
    if value == 0.0 {
        return EncodedNumber {
            base: 0,
            exponent: 0,
        };
    }

    let exponent = (1.0 + value.abs().log10()).floor() as i32;
    let multiplier = 10f64.powi(resolution - exponent);
    // Truncation toward zero, matching the firmware's integer cast
    let base = (value * multiplier) as i64;

    EncodedNumber {
        base,
        exponent: exponent - resolution,
    }
}

/// Encode a slice of floats, flattening the (base, exponent) pairs in input order
pub fn encode_many(values: &[f64], resolution: i32) -> Vec<i64> {
    let mut out = Vec::with_capacity(values.len() * 2);
    for &value in values {
        let encoded = encode(value, resolution);
        out.push(encoded.base);
        out.push(encoded.exponent as i64);
    }
    out
}

// === Outbound line builders ===
//
// All lines are space-separated and carriage-return terminated; the
// controller reads up to the '\r'. Field order is fixed per message type.

/// Velocity command: `s <vBase> <vExp> <omegaBase> <omegaExp>\r`
pub fn velocity_line(linear: f64, angular: f64) -> String {
    let parts = encode_many(&[linear, angular], DEFAULT_RESOLUTION);
    format!("s {} {} {} {}\r", parts[0], parts[1], parts[2], parts[3])
}

/// Odometry parameters. Counts per revolution is a plain integer; it needs
/// no fractional precision and is sent unencoded.
pub fn odom_params_line(params: &OdomParams) -> String {
    let wheel = encode(params.wheel_diameter, DEFAULT_RESOLUTION);
    let track = encode(params.track_width, DEFAULT_RESOLUTION);
    format!(
        "DifferentialDriveOdomParams {} {} {} {} {}\r",
        wheel.base, wheel.exponent, track.base, track.exponent, params.counts_per_revolution
    )
}

/// PID drive gains, in velocity-P, velocity-I, turn-P, turn-I order
pub fn gains_line(gains: &DriveGains) -> String {
    let parts = encode_many(
        &[
            gains.velocity_p,
            gains.velocity_i,
            gains.turn_p,
            gains.turn_i,
        ],
        DEFAULT_RESOLUTION,
    );
    format!(
        "DifferentialDriveGains {} {} {} {} {} {} {} {}\r",
        parts[0], parts[1], parts[2], parts[3], parts[4], parts[5], parts[6], parts[7]
    )
}

/// Battery monitor low-voltage threshold
pub fn battery_line(params: &BatteryParams) -> String {
    let limit = encode(params.voltage_too_low_limit, DEFAULT_RESOLUTION);
    format!("BatteryMonitorParams {} {}\r", limit.base, limit.exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(encoded: EncodedNumber) -> f64 {
        encoded.base as f64 * 10f64.powi(encoded.exponent)
    }

    #[test]
    fn test_zero_encodes_as_zero_pair() {
        for resolution in [1, 4, 8] {
            let encoded = encode(0.0, resolution);
            assert_eq!(encoded.base, 0);
            assert_eq!(encoded.exponent, 0);
        }
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(
            encode(1.0, 4),
            EncodedNumber {
                base: 1000,
                exponent: -3
            }
        );
        assert_eq!(
            encode(0.5, 4),
            EncodedNumber {
                base: 5000,
                exponent: -4
            }
        );
        assert_eq!(
            encode(2.0, 4),
            EncodedNumber {
                base: 2000,
                exponent: -3
            }
        );
        assert_eq!(
            encode(0.25, 4),
            EncodedNumber {
                base: 2500,
                exponent: -4
            }
        );
        assert_eq!(
            encode(12.0, 4),
            EncodedNumber {
                base: 1200,
                exponent: -2
            }
        );
    }

    #[test]
    fn test_negative_values_truncate_toward_zero() {
        assert_eq!(
            encode(-1.5, 4),
            EncodedNumber {
                base: -1500,
                exponent: -3
            }
        );
        assert_eq!(
            encode(-0.25, 4),
            EncodedNumber {
                base: -2500,
                exponent: -4
            }
        );
    }

    #[test]
    fn test_large_value_drops_digits_past_resolution() {
        // 123456.0 keeps four significant digits: 1234 * 10^2
        assert_eq!(
            encode(123456.0, 4),
            EncodedNumber {
                base: 1234,
                exponent: 2
            }
        );
    }

    #[test]
    fn test_roundtrip_within_resolution() {
        let values = [0.03, 0.5, 1.5, 2.7182, 12.0, 3141.59, -0.042, -87.3];
        for &value in &values {
            let encoded = encode(value, 4);
            let decoded = decode(encoded);
            // Four significant digits: relative error below 10^-3
            let tolerance = value.abs() * 1e-3;
            assert!(
                (decoded - value).abs() <= tolerance,
                "{} decoded as {} (off by {})",
                value,
                decoded,
                (decoded - value).abs()
            );
        }
    }

    #[test]
    fn test_base_magnitude_bounded_by_resolution() {
        for &value in &[0.001, 0.4567, 9.999, 54321.0, -654.3] {
            let encoded = encode(value, 4);
            assert!(
                encoded.base.abs() < 10_000,
                "base {} exceeds 4 digits for {}",
                encoded.base,
                value
            );
        }
    }

    #[test]
    fn test_encode_many_preserves_order() {
        let flat = encode_many(&[1.0, 0.5, 2.0], 4);
        let expected: Vec<i64> = [encode(1.0, 4), encode(0.5, 4), encode(2.0, 4)]
            .iter()
            .flat_map(|e| [e.base, e.exponent as i64])
            .collect();
        assert_eq!(flat, expected);
        assert_eq!(flat, vec![1000, -3, 5000, -4, 2000, -3]);
    }

    #[test]
    fn test_velocity_line_format() {
        assert_eq!(velocity_line(1.0, 0.5), "s 1000 -3 5000 -4\r");
        assert_eq!(velocity_line(0.0, 0.0), "s 0 0 0 0\r");
    }

    #[test]
    fn test_gains_line_format() {
        let gains = DriveGains {
            velocity_p: 1.0,
            velocity_i: 0.5,
            turn_p: 2.0,
            turn_i: 0.25,
        };
        assert_eq!(
            gains_line(&gains),
            "DifferentialDriveGains 1000 -3 5000 -4 2000 -3 2500 -4\r"
        );
    }

    #[test]
    fn test_odom_params_line_keeps_counts_unencoded() {
        let params = OdomParams {
            wheel_diameter: 0.1524,
            track_width: 0.37,
            counts_per_revolution: 9750,
        };
        assert_eq!(
            odom_params_line(&params),
            "DifferentialDriveOdomParams 1524 -4 3700 -4 9750\r"
        );
    }

    #[test]
    fn test_battery_line_format() {
        let params = BatteryParams {
            voltage_too_low_limit: 12.0,
        };
        assert_eq!(battery_line(&params), "BatteryMonitorParams 1200 -2\r");
    }
}
