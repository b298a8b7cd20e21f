// src/lib.rs - SCARA arm controller library
pub mod config;
pub mod geometry;
pub mod hardware;
pub mod motion;

pub use config::{Config, ConfigError, load_config};
pub use geometry::{Circle, IntersectionPair, NoIntersection, Point2};
pub use hardware::{HardwareError, MotorId, PwmActuator, SerialPwm, ServoCalibration, SimulatedPwm};
pub use motion::{
    ArmSolution, CancelFlag, Kinematics, MotionController, MotionError, MoveReport, PathReport,
    ScaraKinematics, Unreachable, VerticalMove,
};
