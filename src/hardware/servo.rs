// src/hardware/servo.rs - Joint angle <-> servo pulse width mapping
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorId {
    Motor1,
    Motor2,
}

impl MotorId {
    pub const ALL: [MotorId; 2] = [MotorId::Motor1, MotorId::Motor2];

    pub const fn name(&self) -> &'static str {
        match self {
            MotorId::Motor1 => "motor1",
            MotorId::Motor2 => "motor2",
        }
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MotorId {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "motor1" => Ok(MotorId::Motor1),
            "motor2" => Ok(MotorId::Motor2),
            other => Err(ServoError::UnknownMotor(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ServoError {
    #[error("Angle out of range for {motor}: adjusted angle {adjusted:.2} must be between 0 and {max_angle} degrees")]
    OutOfRange {
        motor: MotorId,
        adjusted: f64,
        max_angle: f64,
    },
    #[error("Invalid motor identifier `{0}`. Use 'motor1' or 'motor2'.")]
    UnknownMotor(String),
}

/// Per-motor calibration: which PWM channel drives it, where its zero sits
/// in the robot frame, and the pulse widths at both ends of its travel.
///
/// `min_pulse` may be larger than `max_pulse` for a servo mounted the other
/// way round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServoCalibration {
    pub channel: u8,
    /// Robot-frame angle (degrees) that corresponds to servo angle 0.
    pub offset: f64,
    pub min_pulse: u32,
    pub max_pulse: u32,
    pub max_angle: f64,
}

impl ServoCalibration {
    pub fn new(channel: u8, offset: f64) -> Self {
        Self {
            channel,
            offset,
            min_pulse: default_min_pulse(),
            max_pulse: default_max_pulse(),
            max_angle: default_max_angle(),
        }
    }

    /// Servo-frame angle for a robot-frame joint angle, in `[0, 360)`.
    pub fn adjusted_angle(&self, angle: f64) -> f64 {
        (angle - self.offset).rem_euclid(360.0)
    }

    pub fn angle_to_pulse(&self, motor: MotorId, angle: f64) -> Result<u32, ServoError> {
        let adjusted = self.adjusted_angle(angle);
        if !(0.0..=self.max_angle).contains(&adjusted) {
            return Err(ServoError::OutOfRange {
                motor,
                adjusted,
                max_angle: self.max_angle,
            });
        }
        let span = self.max_pulse as f64 - self.min_pulse as f64;
        let pulse = (adjusted / self.max_angle * span + self.min_pulse as f64).round();
        Ok(pulse as u32)
    }

    /// Inverse of [`angle_to_pulse`](Self::angle_to_pulse): the robot-frame
    /// joint angle a pulse width commands, normalized to `[0, 360)`.
    pub fn pulse_to_angle(&self, pulse: u32) -> f64 {
        let span = self.max_pulse as f64 - self.min_pulse as f64;
        let adjusted = (pulse as f64 - self.min_pulse as f64) / span * self.max_angle;
        (adjusted + self.offset).rem_euclid(360.0)
    }

    /// Degrees covered by one microsecond of pulse width.
    pub fn resolution(&self) -> f64 {
        self.max_angle / (self.max_pulse as f64 - self.min_pulse as f64).abs()
    }

    pub fn validate(&self, motor: MotorId) -> Result<(), String> {
        if !(self.max_angle > 0.0 && self.max_angle <= 360.0) {
            return Err(format!("{}: max_angle must be in (0, 360]", motor));
        }
        if self.min_pulse == self.max_pulse {
            return Err(format!("{}: min_pulse and max_pulse must differ", motor));
        }
        if !self.offset.is_finite() {
            return Err(format!("{}: offset must be finite", motor));
        }
        Ok(())
    }
}

fn default_min_pulse() -> u32 { 2590 }
fn default_max_pulse() -> u32 { 570 }
fn default_max_angle() -> f64 { 270.0 }

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn motor1() -> ServoCalibration {
        ServoCalibration::new(0, 68.0)
    }

    #[test]
    fn test_endpoints_are_exact() {
        let cal = motor1();
        assert_eq!(cal.angle_to_pulse(MotorId::Motor1, 68.0), Ok(2590));
        assert_eq!(cal.angle_to_pulse(MotorId::Motor1, 68.0 + 270.0), Ok(570));
    }

    #[test]
    fn test_offset_wraps_around() {
        let cal = ServoCalibration::new(1, 214.0);
        // 10 degrees wraps to 156 in the servo frame
        assert!((cal.adjusted_angle(10.0) - 156.0).abs() < 1e-9);
        let pulse = cal.angle_to_pulse(MotorId::Motor2, 10.0).unwrap();
        assert_eq!(pulse, (156.0 / 270.0 * -2020.0 + 2590.0f64).round() as u32);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let cal = motor1();
        // adjusted = 300, beyond the 270 degree travel
        match cal.angle_to_pulse(MotorId::Motor1, 8.0) {
            Err(ServoError::OutOfRange { motor, adjusted, max_angle }) => {
                assert_eq!(motor, MotorId::Motor1);
                assert!((adjusted - 300.0).abs() < 1e-9);
                assert_eq!(max_angle, 270.0);
            }
            other => panic!("expected out of range, got {:?}", other),
        }
        assert!(cal.angle_to_pulse(MotorId::Motor1, f64::NAN).is_err());
    }

    #[test]
    fn test_non_inverted_calibration() {
        let cal = ServoCalibration {
            channel: 3,
            offset: 0.0,
            min_pulse: 500,
            max_pulse: 2500,
            max_angle: 180.0,
        };
        assert_eq!(cal.angle_to_pulse(MotorId::Motor1, 0.0), Ok(500));
        assert_eq!(cal.angle_to_pulse(MotorId::Motor1, 90.0), Ok(1500));
        assert_eq!(cal.angle_to_pulse(MotorId::Motor1, 180.0), Ok(2500));
    }

    #[test]
    fn test_motor_id_parsing() {
        assert_eq!("motor1".parse::<MotorId>(), Ok(MotorId::Motor1));
        assert_eq!("motor2".parse::<MotorId>(), Ok(MotorId::Motor2));
        assert_eq!(
            "motor3".parse::<MotorId>(),
            Err(ServoError::UnknownMotor("motor3".to_string()))
        );
        assert_eq!(MotorId::Motor2.to_string(), "motor2");
    }

    #[test]
    fn test_validate() {
        assert!(motor1().validate(MotorId::Motor1).is_ok());
        let mut cal = motor1();
        cal.max_angle = 0.0;
        assert!(cal.validate(MotorId::Motor1).is_err());
        let mut cal = motor1();
        cal.max_pulse = cal.min_pulse;
        assert!(cal.validate(MotorId::Motor1).is_err());
    }

    proptest! {
        #[test]
        fn prop_pulse_is_monotonic(a in 0.0f64..270.0, b in 0.0f64..270.0) {
            let cal = motor1();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let p_lo = cal.angle_to_pulse(MotorId::Motor1, lo + cal.offset).unwrap();
            let p_hi = cal.angle_to_pulse(MotorId::Motor1, hi + cal.offset).unwrap();
            // inverted calibration: pulse falls as the angle grows
            prop_assert!(p_hi <= p_lo);
        }

        #[test]
        fn prop_pulse_round_trip(a in 0.0f64..=270.0) {
            let cal = motor1();
            let angle = (a + cal.offset).rem_euclid(360.0);
            let pulse = cal.angle_to_pulse(MotorId::Motor1, angle).unwrap();
            let back = cal.pulse_to_angle(pulse);
            let diff = (back - angle).rem_euclid(360.0);
            let diff = diff.min(360.0 - diff);
            prop_assert!(diff <= cal.resolution() / 2.0 + 1e-9);
        }
    }
}
