// src/motion/mod.rs - Kinematics, path planning and the motion controller
pub mod controller;
pub mod kinematics;
pub mod path;

pub use controller::{CancelFlag, MotionController, MoveReport, PathReport, VerticalMove};
pub use kinematics::{
    Arm, ArmPose, ArmSolution, JointAngles, JointLimits, Kinematics, ScaraKinematics, Unreachable,
};

use crate::geometry::Point2;
use crate::hardware::{HardwareError, ServoError};
use thiserror::Error;

/// Failure to drive the servos for a solved pose.
#[derive(Debug, Error)]
pub enum ActuationError {
    #[error(transparent)]
    Servo(#[from] ServoError),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

#[derive(Debug, Error)]
pub enum MotionError {
    /// The target failed kinematic validation. Nothing moved and the
    /// tool position is unchanged.
    #[error("Target unreachable: {0}")]
    Unreachable(#[from] Unreachable),
    /// The tool position was committed but the servos could not be driven
    /// there. Logical and physical state may have diverged.
    #[error("Actuation failed after committing {position}: {source}")]
    ActuationAfterCommit {
        position: Point2,
        #[source]
        source: ActuationError,
    },
    #[error("Path stopped after {completed} of {total} waypoints: {source}")]
    PathInterrupted {
        completed: usize,
        total: usize,
        /// Last waypoint that was fully executed.
        reached: Option<Point2>,
        #[source]
        source: Box<MotionError>,
    },
    #[error("Path cancelled after {completed} of {total} waypoints")]
    Cancelled {
        completed: usize,
        total: usize,
        reached: Option<Point2>,
    },
    #[error("Interpolation needs at least one step")]
    InvalidSteps,
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
    #[error("Servo error: {0}")]
    Servo(#[from] ServoError),
}

impl MotionError {
    /// True when the controller's idea of the tool position can no longer
    /// be trusted and the robot needs a stop or a resync.
    pub fn is_fatal(&self) -> bool {
        match self {
            MotionError::ActuationAfterCommit { .. } => true,
            MotionError::PathInterrupted { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}
