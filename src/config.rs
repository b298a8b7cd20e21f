//! # Robot Configuration
//!
//! Geometry, servo calibration, lift servo and PWM driver settings for the
//! SCARA controller, loaded from a single TOML file. Every section and every
//! field is optional; missing values fall back to the defaults below.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [robot]
//! pivot1 = [-80.0, -50.0]
//! pivot2 = [80.0, -50.0]
//! upper_arm = 180.0
//! forearm = 260.0
//! home = [0.0, 60.0]
//!
//! [robot.limits]
//! arm1_min = 45.0
//! arm1_max = 315.0
//!
//! [motors.motor1]
//! channel = 0
//! offset = 68.0
//!
//! [pwm]
//! driver = "serial"
//! serial = "/dev/ttyACM0"
//! ```
//!
//! ## Example: Rust Usage
//!
//! ```rust
//! use scara_rs::config::Config;
//! let toml_str = r#"
//! [robot]
//! forearm = 250.0
//!
//! [lift]
//! lift_time_ms = 2000
//! "#;
//! let config: Config = toml::from_str(toml_str).unwrap();
//! assert_eq!(config.robot.forearm, 250.0);
//! assert_eq!(config.robot.upper_arm, 180.0);
//! assert_eq!(config.lift.lift_time_ms, 2000);
//! assert!(config.validate().is_ok());
//! ```

// src/config.rs - Single configuration file
use crate::geometry::Point2;
use crate::hardware::{MAX_CHANNELS, MotorId, ServoCalibration};
use crate::motion::{JointLimits, Kinematics, ScaraKinematics};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the arm geometry, servos and PWM driver.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub motors: MotorsConfig,
    #[serde(default)]
    pub lift: LiftConfig,
    #[serde(default)]
    pub pwm: PwmConfig,
    #[serde(default)]
    pub motion: MotionConfig,
}

/// Arm geometry in millimetres, robot frame.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    #[serde(default = "default_pivot1")]
    pub pivot1: [f64; 2],
    #[serde(default = "default_pivot2")]
    pub pivot2: [f64; 2],
    #[serde(default = "default_upper_arm")]
    pub upper_arm: f64,
    #[serde(default = "default_forearm")]
    pub forearm: f64,
    /// Tool position assumed at startup.
    #[serde(default = "default_home")]
    pub home: [f64; 2],
    #[serde(default)]
    pub limits: JointLimits,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            pivot1: default_pivot1(),
            pivot2: default_pivot2(),
            upper_arm: default_upper_arm(),
            forearm: default_forearm(),
            home: default_home(),
            limits: JointLimits::default(),
        }
    }
}

impl RobotConfig {
    pub fn kinematics(&self) -> ScaraKinematics {
        ScaraKinematics::new(
            Point2::from(self.pivot1),
            Point2::from(self.pivot2),
            self.upper_arm,
            self.forearm,
            self.limits,
        )
    }

    pub fn home(&self) -> Point2 {
        Point2::from(self.home)
    }
}

/// Servo calibration for both arm motors.
///
/// Each `[motors.motorN]` table only overrides the fields it names; the rest
/// come from that motor's own defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "MotorsToml")]
pub struct MotorsConfig {
    pub motor1: ServoCalibration,
    pub motor2: ServoCalibration,
}

#[derive(Debug, Deserialize)]
struct MotorsToml {
    #[serde(default)]
    motor1: CalibrationToml,
    #[serde(default)]
    motor2: CalibrationToml,
}

#[derive(Debug, Default, Deserialize)]
struct CalibrationToml {
    channel: Option<u8>,
    offset: Option<f64>,
    min_pulse: Option<u32>,
    max_pulse: Option<u32>,
    max_angle: Option<f64>,
}

impl CalibrationToml {
    fn over(self, base: ServoCalibration) -> ServoCalibration {
        ServoCalibration {
            channel: self.channel.unwrap_or(base.channel),
            offset: self.offset.unwrap_or(base.offset),
            min_pulse: self.min_pulse.unwrap_or(base.min_pulse),
            max_pulse: self.max_pulse.unwrap_or(base.max_pulse),
            max_angle: self.max_angle.unwrap_or(base.max_angle),
        }
    }
}

impl From<MotorsToml> for MotorsConfig {
    fn from(raw: MotorsToml) -> Self {
        Self {
            motor1: raw.motor1.over(default_motor1()),
            motor2: raw.motor2.over(default_motor2()),
        }
    }
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            motor1: default_motor1(),
            motor2: default_motor2(),
        }
    }
}

impl MotorsConfig {
    pub fn get(&self, motor: MotorId) -> &ServoCalibration {
        match motor {
            MotorId::Motor1 => &self.motor1,
            MotorId::Motor2 => &self.motor2,
        }
    }
}

/// Continuous-rotation servo that raises and lowers the tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiftConfig {
    #[serde(default = "default_lift_channel")]
    pub channel: u8,
    #[serde(default = "default_lift_pulse")]
    pub lift_pulse: u32,
    #[serde(default = "default_lower_pulse")]
    pub lower_pulse: u32,
    #[serde(default = "default_stop_pulse")]
    pub stop_pulse: u32,
    #[serde(default = "default_travel_time_ms")]
    pub lift_time_ms: u64,
    #[serde(default = "default_travel_time_ms")]
    pub lower_time_ms: u64,
    /// Nominal travel; informational only, timing comes from the *_time_ms fields.
    #[serde(default = "default_height_mm")]
    pub height_mm: f64,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            channel: default_lift_channel(),
            lift_pulse: default_lift_pulse(),
            lower_pulse: default_lower_pulse(),
            stop_pulse: default_stop_pulse(),
            lift_time_ms: default_travel_time_ms(),
            lower_time_ms: default_travel_time_ms(),
            height_mm: default_height_mm(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PwmDriver {
    Simulated,
    Serial,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PwmConfig {
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: u32,
    #[serde(default = "default_driver")]
    pub driver: PwmDriver,
    #[serde(default)]
    pub serial: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            driver: default_driver(),
            serial: String::new(),
            baud: default_baud(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl PwmConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Defaults for interpolated moves.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionConfig {
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl MotionConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    /// Check the configuration for values the controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };
        let robot = &self.robot;
        if !(robot.upper_arm > 0.0 && robot.upper_arm.is_finite()) {
            return invalid(format!("upper_arm must be > 0, got {}", robot.upper_arm));
        }
        if !(robot.forearm > 0.0 && robot.forearm.is_finite()) {
            return invalid(format!("forearm must be > 0, got {}", robot.forearm));
        }
        let limits = &robot.limits;
        if limits.arm1_min > limits.arm1_max {
            return invalid("limits.arm1_min must not exceed limits.arm1_max".to_string());
        }
        if limits.arm2_excluded_min > limits.arm2_excluded_max {
            return invalid(
                "limits.arm2_excluded_min must not exceed limits.arm2_excluded_max".to_string(),
            );
        }
        for motor in MotorId::ALL {
            self.motors.get(motor).validate(motor).map_err(ConfigError::Invalid)?;
        }
        let channels = [self.motors.motor1.channel, self.motors.motor2.channel, self.lift.channel];
        if let Some(ch) = channels.iter().find(|ch| **ch >= MAX_CHANNELS) {
            return invalid(format!("PWM channel {} does not exist", ch));
        }
        if channels[0] == channels[1] || channels[0] == channels[2] || channels[1] == channels[2] {
            return invalid(format!("PWM channels must be distinct, got {:?}", channels));
        }
        if self.pwm.frequency_hz == 0 {
            return invalid("pwm.frequency_hz must be > 0".to_string());
        }
        if self.pwm.driver == PwmDriver::Serial && self.pwm.serial.is_empty() {
            return invalid("pwm.serial must name a port for the serial driver".to_string());
        }
        if self.motion.steps == 0 {
            return invalid("motion.steps must be > 0".to_string());
        }
        // the controller starts out believing the tool is at home
        if let Err(e) = robot.kinematics().inverse(robot.home()) {
            return invalid(format!("home position {} is not reachable: {}", robot.home(), e));
        }
        Ok(())
    }
}

// Default value functions
fn default_pivot1() -> [f64; 2] { [-80.0, -50.0] }
fn default_pivot2() -> [f64; 2] { [80.0, -50.0] }
fn default_upper_arm() -> f64 { 180.0 }
fn default_forearm() -> f64 { 260.0 }
fn default_home() -> [f64; 2] { [0.0, 60.0] }
fn default_motor1() -> ServoCalibration { ServoCalibration::new(0, 68.0) }
fn default_motor2() -> ServoCalibration { ServoCalibration::new(1, 214.0) }
fn default_lift_channel() -> u8 { 2 }
fn default_lift_pulse() -> u32 { 1500 }
fn default_lower_pulse() -> u32 { 1610 }
fn default_stop_pulse() -> u32 { 1550 }
fn default_travel_time_ms() -> u64 { 10_000 }
fn default_height_mm() -> f64 { 100.0 }
fn default_frequency_hz() -> u32 { 50 }
fn default_driver() -> PwmDriver { PwmDriver::Simulated }
fn default_baud() -> u32 { 115200 }
fn default_response_timeout_ms() -> u64 { 500 }
fn default_steps() -> usize { 10 }
fn default_delay_ms() -> u64 { 100 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}
