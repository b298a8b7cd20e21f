// src/motion/controller.rs - Motion controller driving the arm servos
use crate::config::{Config, ConfigError, LiftConfig, MotorsConfig};
use crate::geometry::Point2;
use crate::hardware::{HardwareError, MotorId, PwmActuator};
use crate::motion::kinematics::{ArmSolution, Kinematics, ScaraKinematics};
use crate::motion::path::linear_waypoints;
use crate::motion::{ActuationError, MotionError};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Result of a single validated move.
#[derive(Debug, Clone, Serialize)]
pub struct MoveReport {
    pub solution: ArmSolution,
    pub pulses: [u32; 2],
}

/// Result of a fully executed interpolated move.
#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub waypoints: usize,
    pub position: Point2,
}

/// One timed run of the lift servo: drive at `pulse` for `hold`, then stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMove {
    pub pulse: u32,
    pub hold: Duration,
}

impl VerticalMove {
    pub fn lift(config: &LiftConfig) -> Self {
        Self {
            pulse: config.lift_pulse,
            hold: Duration::from_millis(config.lift_time_ms),
        }
    }

    pub fn lower(config: &LiftConfig) -> Self {
        Self {
            pulse: config.lower_pulse,
            hold: Duration::from_millis(config.lower_time_ms),
        }
    }
}

/// Shared flag that stops an interpolated move before its next waypoint.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns the tool position and is the only writer of it.
///
/// Not meant to be shared between tasks; wrap it in a `tokio::sync::Mutex`
/// if several callers need to issue moves.
pub struct MotionController<A: PwmActuator> {
    kinematics: ScaraKinematics,
    motors: MotorsConfig,
    lift: LiftConfig,
    frequency_hz: u32,
    actuator: A,
    position: Point2,
    cancel: Option<CancelFlag>,
}

impl<A: PwmActuator> MotionController<A> {
    pub fn new(config: &Config, actuator: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let position = config.robot.home();
        tracing::info!(
            "Initialized motion controller at {} (upper arm {} mm, forearm {} mm)",
            position,
            config.robot.upper_arm,
            config.robot.forearm
        );
        Ok(Self {
            kinematics: config.robot.kinematics(),
            motors: config.motors.clone(),
            lift: config.lift.clone(),
            frequency_hz: config.pwm.frequency_hz,
            actuator,
            position,
            cancel: None,
        })
    }

    /// Configure the PWM frame rate. Call once before the first move.
    pub async fn initialize(&self) -> Result<(), MotionError> {
        tracing::info!("Setting PWM frequency to {} Hz", self.frequency_hz);
        self.actuator.set_frequency(self.frequency_hz).await?;
        Ok(())
    }

    pub fn position(&self) -> Point2 {
        self.position
    }

    pub fn lift_config(&self) -> &LiftConfig {
        &self.lift
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn set_cancel_flag(&mut self, flag: CancelFlag) {
        self.cancel = Some(flag);
    }

    /// Move the tool to `target` in one step.
    ///
    /// An unreachable target leaves the position untouched and sends nothing.
    /// Once the target is validated it becomes the new position, so any
    /// failure to drive the servos afterwards is reported as
    /// [`MotionError::ActuationAfterCommit`].
    pub async fn move_to(&mut self, target: Point2) -> Result<MoveReport, MotionError> {
        let solution = match self.kinematics.inverse(target) {
            Ok(solution) => solution,
            Err(e) => {
                tracing::warn!("Rejected move to {}: {}", target, e);
                return Err(MotionError::Unreachable(e));
            }
        };
        self.position = target;

        match self.actuate(&solution).await {
            Ok(pulses) => {
                tracing::debug!(
                    "Moved to {} (angles {:.2}/{:.2}, pulses {}/{})",
                    target,
                    solution.arm1.angle,
                    solution.arm2.angle,
                    pulses[0],
                    pulses[1]
                );
                Ok(MoveReport { solution, pulses })
            }
            Err(source) => {
                tracing::error!("Actuation failed after committing {}: {}", target, source);
                Err(MotionError::ActuationAfterCommit { position: target, source })
            }
        }
    }

    async fn actuate(&self, solution: &ArmSolution) -> Result<[u32; 2], ActuationError> {
        // map both joints before commanding either
        let pulse1 = self.motors.motor1.angle_to_pulse(MotorId::Motor1, solution.arm1.angle)?;
        let pulse2 = self.motors.motor2.angle_to_pulse(MotorId::Motor2, solution.arm2.angle)?;
        self.actuator.set_pulse(self.motors.motor1.channel, pulse1).await?;
        self.actuator.set_pulse(self.motors.motor2.channel, pulse2).await?;
        Ok([pulse1, pulse2])
    }

    /// Move along a straight line to `target` through `steps` evenly spaced
    /// waypoints, pausing `delay` between consecutive waypoints.
    ///
    /// Stops at the first waypoint that fails. Waypoints already executed
    /// stay executed; the error reports how far the path got.
    pub async fn interpolated_move(
        &mut self,
        target: Point2,
        steps: usize,
        delay: Duration,
    ) -> Result<PathReport, MotionError> {
        let waypoints =
            linear_waypoints(self.position, target, steps).ok_or(MotionError::InvalidSteps)?;
        let total = waypoints.len();
        tracing::info!("Interpolating from {} to {} in {} steps", self.position, target, total);

        let mut reached = None;
        for (i, waypoint) in waypoints.enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.cancel.as_ref().is_some_and(|flag| flag.is_cancelled()) {
                tracing::warn!("Interpolated move cancelled after {} of {} waypoints", i, total);
                return Err(MotionError::Cancelled { completed: i, total, reached });
            }
            tracing::debug!("Waypoint {}/{}: {}", i + 1, total, waypoint);
            if let Err(e) = self.move_to(waypoint).await {
                tracing::warn!("Interpolated move stopped at waypoint {}/{}", i + 1, total);
                return Err(MotionError::PathInterrupted {
                    completed: i,
                    total,
                    reached,
                    source: Box::new(e),
                });
            }
            reached = Some(waypoint);
        }

        tracing::info!("Interpolated move to {} completed", target);
        Ok(PathReport { waypoints: total, position: self.position })
    }

    /// Run the lift servo upwards for the configured time.
    pub async fn lift(&self, mv: VerticalMove) -> Result<(), MotionError> {
        tracing::info!("Lifting tool (nominal {} mm, pulse {})", self.lift.height_mm, mv.pulse);
        self.run_vertical(mv).await
    }

    /// Run the lift servo downwards for the configured time.
    pub async fn lower(&self, mv: VerticalMove) -> Result<(), MotionError> {
        tracing::info!("Lowering tool (nominal {} mm, pulse {})", self.lift.height_mm, mv.pulse);
        self.run_vertical(mv).await
    }

    async fn run_vertical(&self, mv: VerticalMove) -> Result<(), MotionError> {
        let channel = self.lift.channel;
        let result: Result<(), HardwareError> = async {
            self.actuator.set_pulse(channel, mv.pulse).await?;
            tokio::time::sleep(mv.hold).await;
            self.actuator.set_pulse(channel, self.lift.stop_pulse).await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Lift servo failed: {}", e);
            // try not to leave the servo spinning
            if let Err(stop_err) = self.actuator.set_pulse(channel, self.lift.stop_pulse).await {
                tracing::error!("Could not stop lift servo: {}", stop_err);
            }
            return Err(MotionError::Hardware(e));
        }
        Ok(())
    }

    /// Drive one joint straight to `angle` without touching the tool position.
    pub async fn set_joint_angle(&self, motor: MotorId, angle: f64) -> Result<u32, MotionError> {
        let calibration = self.motors.get(motor);
        let pulse = calibration.angle_to_pulse(motor, angle)?;
        self.actuator.set_pulse(calibration.channel, pulse).await?;
        tracing::info!("Set {} to {:.2} deg (pulse {})", motor, angle, pulse);
        Ok(pulse)
    }
}
