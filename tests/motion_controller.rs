// Integration tests for the motion controller against the simulated PWM board

use async_trait::async_trait;
use scara_rs::hardware::{HardwareError, PwmActuator, PwmCommand, SimulatedPwm};
use scara_rs::motion::{ActuationError, CancelFlag, MotionController, MotionError, Unreachable};
use scara_rs::{Config, MotorId, Point2};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn create_test_config() -> Config {
    let mut config = Config::default();
    config.robot.home = [-40.0, 20.0];
    config.motion.delay_ms = 0;
    config
}

fn create_controller() -> MotionController<Arc<SimulatedPwm>> {
    MotionController::new(&create_test_config(), Arc::new(SimulatedPwm::new())).unwrap()
}

/// Forwards to a simulated board and raises a cancel flag after a number of pulses.
struct CancellingPwm {
    inner: SimulatedPwm,
    flag: CancelFlag,
    cancel_after: usize,
    sent: AtomicUsize,
}

#[async_trait]
impl PwmActuator for CancellingPwm {
    async fn set_pulse(&self, channel: u8, pulse_us: u32) -> Result<(), HardwareError> {
        self.inner.set_pulse(channel, pulse_us).await?;
        if self.sent.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_after {
            self.flag.cancel();
        }
        Ok(())
    }

    async fn set_frequency(&self, hz: u32) -> Result<(), HardwareError> {
        self.inner.set_frequency(hz).await
    }
}

#[tokio::test]
async fn test_controller_creation_rejects_invalid_config() {
    let mut config = create_test_config();
    config.robot.home = [0.0, 100.0];
    assert!(MotionController::new(&config, SimulatedPwm::new()).is_err());
}

#[tokio::test]
async fn test_full_interpolated_move() {
    let mut controller = create_controller();
    controller.initialize().await.unwrap();
    assert_eq!(controller.actuator().commands().await, vec![PwmCommand::Frequency { hz: 50 }]);
    controller.actuator().clear().await;
    let report = controller
        .interpolated_move(Point2::new(-40.0, 80.0), 4, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(report.waypoints, 4);
    assert_eq!(report.position, Point2::new(-40.0, 80.0));
    assert_eq!(controller.position(), Point2::new(-40.0, 80.0));

    let pwm = controller.actuator();
    assert_eq!(pwm.pulses_for(0).await, vec![1365, 1587, 1672, 1731]);
    assert_eq!(pwm.pulses_for(1).await, vec![2259, 2345, 2425, 2499]);
    assert_eq!(pwm.commands().await.len(), 8);
}

#[tokio::test]
async fn test_single_step_goes_straight_to_target() {
    let mut controller = create_controller();
    let report = controller
        .interpolated_move(Point2::new(0.0, 20.0), 1, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(report.waypoints, 1);
    assert_eq!(controller.actuator().pulses_for(0).await, vec![1828]);
    assert_eq!(controller.actuator().pulses_for(1).await, vec![2190]);
}

#[tokio::test]
async fn test_partial_path_stops_at_last_reached_waypoint() {
    let mut controller = create_controller();
    // waypoints every 20 mm in y; arm 2 folds into its forbidden band at y = 100
    let err = controller
        .interpolated_move(Point2::new(-40.0, 140.0), 7, Duration::ZERO)
        .await
        .unwrap_err();
    match &err {
        MotionError::PathInterrupted { completed, total, reached, source } => {
            assert_eq!(*completed, 4);
            assert_eq!(*total, 7);
            assert_eq!(*reached, Some(Point2::new(-40.0, 80.0)));
            assert!(matches!(
                **source,
                MotionError::Unreachable(Unreachable::OutsideWorkspace { .. })
            ));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!err.is_fatal());
    assert_eq!(controller.position(), Point2::new(-40.0, 80.0));
    assert_eq!(controller.actuator().last_pulse(0).await, Some(1731));
    assert_eq!(controller.actuator().pulses_for(1).await.len(), 4);
}

#[tokio::test]
async fn test_hardware_fault_mid_path_is_fatal() {
    let mut controller = create_controller();
    controller.move_to(Point2::new(-40.0, 40.0)).await.unwrap();
    controller.actuator().fail_channel(0).await;
    let err = controller
        .interpolated_move(Point2::new(-40.0, 80.0), 3, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, MotionError::PathInterrupted { completed: 0, reached: None, .. }));
    // the first waypoint was committed even though the servos never got there
    assert_eq!(controller.position(), Point2::new(-40.0, 40.0));
}

#[tokio::test]
async fn test_unmappable_joint_after_commit_is_fatal() {
    let mut config = create_test_config();
    // arm 2 sits about 32.7 deg past its offset at (-40, 40); the servo only covers 30
    config.motors.motor2.max_angle = 30.0;
    let mut controller = MotionController::new(&config, Arc::new(SimulatedPwm::new())).unwrap();

    let err = controller.move_to(Point2::new(-40.0, 40.0)).await.unwrap_err();
    assert!(err.is_fatal());
    match err {
        MotionError::ActuationAfterCommit { position, source } => {
            assert_eq!(position, Point2::new(-40.0, 40.0));
            match source {
                ActuationError::Servo(scara_rs::hardware::ServoError::OutOfRange {
                    motor, ..
                }) => assert_eq!(motor, MotorId::Motor2),
                other => panic!("unexpected actuation error {:?}", other),
            }
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(controller.position(), Point2::new(-40.0, 40.0));
    // motor 1 maps fine but must not have been driven on its own
    assert!(controller.actuator().commands().await.is_empty());
}

#[tokio::test]
async fn test_cancel_between_waypoints() {
    let flag = CancelFlag::new();
    let pwm = CancellingPwm {
        inner: SimulatedPwm::new(),
        flag: flag.clone(),
        cancel_after: 4,
        sent: AtomicUsize::new(0),
    };
    let mut controller = MotionController::new(&create_test_config(), pwm).unwrap();
    controller.set_cancel_flag(flag.clone());

    let err = controller
        .interpolated_move(Point2::new(-40.0, 80.0), 4, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MotionError::Cancelled { completed: 2, total: 4, reached: Some(_) }
    ));
    assert_eq!(controller.position(), Point2::new(-40.0, 40.0));
    assert_eq!(controller.actuator().inner.pulses_for(0).await, vec![1365, 1587]);

    flag.reset();
    controller
        .interpolated_move(Point2::new(-40.0, 80.0), 2, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(controller.position(), Point2::new(-40.0, 80.0));
}

#[tokio::test]
async fn test_delay_applies_between_waypoints() {
    let mut controller = create_controller();
    let started = std::time::Instant::now();
    controller
        .interpolated_move(Point2::new(-40.0, 80.0), 4, Duration::from_millis(20))
        .await
        .unwrap();
    // three gaps for four waypoints
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_lift_and_lower_use_configured_pulses() {
    let mut config = create_test_config();
    config.lift.lift_time_ms = 5;
    config.lift.lower_time_ms = 5;
    let controller = MotionController::new(&config, Arc::new(SimulatedPwm::new())).unwrap();
    let lift = scara_rs::VerticalMove::lift(controller.lift_config());
    let lower = scara_rs::VerticalMove::lower(controller.lift_config());
    controller.lift(lift).await.unwrap();
    controller.lower(lower).await.unwrap();
    assert_eq!(controller.actuator().pulses_for(2).await, vec![1500, 1550, 1610, 1550]);
    // joints untouched
    assert!(controller.actuator().pulses_for(0).await.is_empty());
    assert_eq!(controller.position(), Point2::new(-40.0, 20.0));
}
