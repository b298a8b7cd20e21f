// src/motion/kinematics.rs - Two-arm SCARA inverse/forward kinematics
use crate::geometry::{Circle, NoIntersection, Point2, bearing_deg, circle_intersections};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kinematics handler mapping a tool position to joint angles and back
pub trait Kinematics: Send + Sync {
    /// Solve the joint angles that place the tool at `target`
    fn inverse(&self, target: Point2) -> Result<ArmSolution, Unreachable>;

    /// Tool position produced by the given joint angles
    fn forward(&self, angles: JointAngles) -> Result<Point2, NoIntersection>;

    /// Check if position is reachable for this kinematics
    fn is_valid_position(&self, target: Point2) -> bool {
        self.inverse(target).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arm {
    One,
    Two,
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm::One => f.write_str("arm 1"),
            Arm::Two => f.write_str("arm 2"),
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum Unreachable {
    #[error("target y = {y} is behind the base")]
    BelowBase { y: f64 },
    #[error("{arm} cannot reach the target: {reason}")]
    Intersection { arm: Arm, reason: NoIntersection },
    #[error("{arm} has no valid elbow position")]
    NoSelection { arm: Arm },
    #[error("{arm} joint angle is undefined")]
    NoAngle { arm: Arm },
    #[error("{arm} angle {angle:.2} is outside its workspace band")]
    OutsideWorkspace { arm: Arm, angle: f64 },
}

/// Mechanical stop limits, in degrees.
///
/// Arm 1 must stay inside `[arm1_min, arm1_max]`; arm 2 must stay out of
/// the open band `(arm2_excluded_min, arm2_excluded_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    #[serde(default = "default_arm1_min")]
    pub arm1_min: f64,
    #[serde(default = "default_arm1_max")]
    pub arm1_max: f64,
    #[serde(default = "default_arm2_excluded_min")]
    pub arm2_excluded_min: f64,
    #[serde(default = "default_arm2_excluded_max")]
    pub arm2_excluded_max: f64,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            arm1_min: default_arm1_min(),
            arm1_max: default_arm1_max(),
            arm2_excluded_min: default_arm2_excluded_min(),
            arm2_excluded_max: default_arm2_excluded_max(),
        }
    }
}

impl JointLimits {
    pub fn allows(&self, arm: Arm, angle: f64) -> bool {
        match arm {
            Arm::One => angle >= self.arm1_min && angle <= self.arm1_max,
            Arm::Two => !(angle > self.arm2_excluded_min && angle < self.arm2_excluded_max),
        }
    }
}

fn default_arm1_min() -> f64 { 45.0 }
fn default_arm1_max() -> f64 { 315.0 }
fn default_arm2_excluded_min() -> f64 { 135.0 }
fn default_arm2_excluded_max() -> f64 { 225.0 }

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointAngles {
    pub arm1: f64,
    pub arm2: f64,
}

/// Geometry of one solved arm, kept for diagnostics and plotting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArmPose {
    /// Circle swept by the elbow around the shoulder pivot.
    pub shoulder: Circle,
    /// Circle of elbow positions whose forearm reaches the target.
    pub reach: Circle,
    pub elbow: Point2,
    pub angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArmSolution {
    pub target: Point2,
    pub arm1: ArmPose,
    pub arm2: ArmPose,
}

impl ArmSolution {
    pub fn angles(&self) -> JointAngles {
        JointAngles {
            arm1: self.arm1.angle,
            arm2: self.arm2.angle,
        }
    }
}

/// Two upper arms on fixed shoulder pivots, joined at the tool by two
/// forearms of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaraKinematics {
    pivot1: Point2,
    pivot2: Point2,
    upper_arm: f64,
    forearm: f64,
    limits: JointLimits,
}

impl ScaraKinematics {
    pub fn new(
        pivot1: Point2,
        pivot2: Point2,
        upper_arm: f64,
        forearm: f64,
        limits: JointLimits,
    ) -> Self {
        Self { pivot1, pivot2, upper_arm, forearm, limits }
    }

    pub fn pivot(&self, arm: Arm) -> Point2 {
        match arm {
            Arm::One => self.pivot1,
            Arm::Two => self.pivot2,
        }
    }

    fn solve_arm(&self, arm: Arm, target: Point2) -> Result<ArmPose, Unreachable> {
        let shoulder = Circle::new(self.pivot(arm), self.upper_arm);
        let reach = Circle::new(target, self.forearm);
        let pair = circle_intersections(&shoulder, &reach)
            .map_err(|reason| Unreachable::Intersection { arm, reason })?;
        let elbow = pair.select().ok_or(Unreachable::NoSelection { arm })?;
        let angle = bearing_deg(&shoulder.center, &elbow).ok_or(Unreachable::NoAngle { arm })?;
        Ok(ArmPose { shoulder, reach, elbow, angle })
    }
}

impl Kinematics for ScaraKinematics {
    fn inverse(&self, target: Point2) -> Result<ArmSolution, Unreachable> {
        if target.y < 0.0 || target.y.is_nan() {
            return Err(Unreachable::BelowBase { y: target.y });
        }
        // both arms must be solvable before either band is checked
        let arm1 = self.solve_arm(Arm::One, target)?;
        let arm2 = self.solve_arm(Arm::Two, target)?;
        for (arm, pose) in [(Arm::One, &arm1), (Arm::Two, &arm2)] {
            if !self.limits.allows(arm, pose.angle) {
                return Err(Unreachable::OutsideWorkspace { arm, angle: pose.angle });
            }
        }
        Ok(ArmSolution { target, arm1, arm2 })
    }

    /// The two forearm circles around the elbows cross twice; the tool is
    /// the crossing farther from the base (larger y).
    fn forward(&self, angles: JointAngles) -> Result<Point2, NoIntersection> {
        let elbow1 = self.pivot1.polar(self.upper_arm, angles.arm1);
        let elbow2 = self.pivot2.polar(self.upper_arm, angles.arm2);
        let pair = circle_intersections(
            &Circle::new(elbow1, self.forearm),
            &Circle::new(elbow2, self.forearm),
        )?;
        if pair.second.y > pair.first.y {
            Ok(pair.second)
        } else {
            Ok(pair.first)
        }
    }
}
