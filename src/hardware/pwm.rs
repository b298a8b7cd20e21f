// src/hardware/pwm.rs - In-memory PWM driver for dry runs and tests
use super::{HardwareError, PwmActuator, check_channel};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PwmCommand {
    Frequency { hz: u32 },
    Pulse { channel: u8, pulse_us: u32 },
}

/// Records every accepted command in order.
///
/// A channel can be marked as failing to exercise the fault paths of the
/// motion controller without real hardware.
#[derive(Debug, Default)]
pub struct SimulatedPwm {
    log: Mutex<Vec<PwmCommand>>,
    failing_channel: Mutex<Option<u8>>,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command on `channel` fail.
    pub async fn fail_channel(&self, channel: u8) {
        *self.failing_channel.lock().await = Some(channel);
    }

    pub async fn clear_failure(&self) {
        *self.failing_channel.lock().await = None;
    }

    pub async fn commands(&self) -> Vec<PwmCommand> {
        self.log.lock().await.clone()
    }

    /// Pulses sent to a single channel, oldest first.
    pub async fn pulses_for(&self, channel: u8) -> Vec<u32> {
        self.log
            .lock()
            .await
            .iter()
            .filter_map(|c| match *c {
                PwmCommand::Pulse { channel: ch, pulse_us } if ch == channel => Some(pulse_us),
                _ => None,
            })
            .collect()
    }

    pub async fn last_pulse(&self, channel: u8) -> Option<u32> {
        self.pulses_for(channel).await.last().copied()
    }

    pub async fn clear(&self) {
        self.log.lock().await.clear();
    }
}

#[async_trait]
impl PwmActuator for SimulatedPwm {
    async fn set_pulse(&self, channel: u8, pulse_us: u32) -> Result<(), HardwareError> {
        check_channel(channel)?;
        if *self.failing_channel.lock().await == Some(channel) {
            tracing::debug!("sim pwm: channel {} refused {}us", channel, pulse_us);
            return Err(HardwareError::Rejected {
                command: format!("set_pulse {} {}", channel, pulse_us),
                response: "simulated fault".to_string(),
            });
        }
        tracing::debug!("sim pwm: channel {} <- {}us", channel, pulse_us);
        self.log.lock().await.push(PwmCommand::Pulse { channel, pulse_us });
        Ok(())
    }

    async fn set_frequency(&self, hz: u32) -> Result<(), HardwareError> {
        tracing::debug!("sim pwm: frequency {}Hz", hz);
        self.log.lock().await.push(PwmCommand::Frequency { hz });
        Ok(())
    }
}
