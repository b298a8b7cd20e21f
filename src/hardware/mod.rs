// src/hardware/mod.rs - PWM actuator capability and drivers
pub mod pwm;
pub mod serial;
pub mod servo;

pub use pwm::{PwmCommand, SimulatedPwm};
pub use serial::SerialPwm;
pub use servo::{MotorId, ServoCalibration, ServoError};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Channels available on a PCA9685-style PWM board.
pub const MAX_CHANNELS: u8 = 16;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("Serial port error: {0}")]
    Serial(#[from] std::io::Error),
    #[error("Not connected to hardware")]
    NotConnected,
    #[error("Timeout waiting for response")]
    Timeout,
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("PWM channel {0} does not exist")]
    InvalidChannel(u8),
    #[error("Command `{command}` rejected: {response}")]
    Rejected { command: String, response: String },
}

/// The only capability the motion code needs from the servo driver:
/// set a channel to a pulse width. Nothing is read back.
#[async_trait]
pub trait PwmActuator: Send + Sync {
    /// Set `channel` to a pulse width in microseconds.
    async fn set_pulse(&self, channel: u8, pulse_us: u32) -> Result<(), HardwareError>;

    /// Set the PWM frame frequency for all channels.
    async fn set_frequency(&self, hz: u32) -> Result<(), HardwareError>;
}

#[async_trait]
impl<T: PwmActuator + ?Sized> PwmActuator for Arc<T> {
    async fn set_pulse(&self, channel: u8, pulse_us: u32) -> Result<(), HardwareError> {
        (**self).set_pulse(channel, pulse_us).await
    }

    async fn set_frequency(&self, hz: u32) -> Result<(), HardwareError> {
        (**self).set_frequency(hz).await
    }
}

#[async_trait]
impl<T: PwmActuator + ?Sized> PwmActuator for Box<T> {
    async fn set_pulse(&self, channel: u8, pulse_us: u32) -> Result<(), HardwareError> {
        (**self).set_pulse(channel, pulse_us).await
    }

    async fn set_frequency(&self, hz: u32) -> Result<(), HardwareError> {
        (**self).set_frequency(hz).await
    }
}

pub(crate) fn check_channel(channel: u8) -> Result<(), HardwareError> {
    if channel >= MAX_CHANNELS {
        return Err(HardwareError::InvalidChannel(channel));
    }
    Ok(())
}
