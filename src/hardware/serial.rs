// src/hardware/serial.rs - PWM board behind an MCU on a serial line
//
// Line protocol, one command per line, each answered by one line:
//   set_pwm_freq <hz>
//   set_pulse <channel> <pulse_us>
// A reply starting with "ok" acknowledges the command; anything else is a rejection.
use super::{HardwareError, PwmActuator, check_channel};
use async_trait::async_trait;
use serial2_tokio::SerialPort;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

pub struct SerialPwm {
    link: Mutex<Link>,
    response_timeout: Duration,
}

struct Link {
    port: SerialPort,
    /// Bytes read past the end of the last reply.
    pending: Vec<u8>,
}

impl SerialPwm {
    pub fn open(path: &str, baud: u32, response_timeout: Duration) -> Result<Self, HardwareError> {
        if path.is_empty() {
            return Err(HardwareError::NotConnected);
        }
        tracing::info!("Connecting to PWM controller: {} at {} baud", path, baud);
        let port = SerialPort::open(path, baud)?;
        tracing::info!("Connected to PWM controller successfully");
        Ok(Self {
            link: Mutex::new(Link { port, pending: Vec::new() }),
            response_timeout,
        })
    }

    async fn send_command(&self, command: &str) -> Result<(), HardwareError> {
        // one exchange at a time so replies pair up with their commands
        let mut link = self.link.lock().await;
        tracing::debug!("PWM <- {}", command);
        link.port.write_all(format!("{}\n", command).as_bytes()).await?;
        let response = timeout(self.response_timeout, link.read_line())
            .await
            .map_err(|_| HardwareError::Timeout)??;
        tracing::debug!("PWM -> {}", response);
        check_reply(command, &response)
    }
}

impl Link {
    async fn read_line(&mut self) -> Result<String, HardwareError> {
        let mut buf = [0u8; 64];
        loop {
            if let Some(line) = take_line(&mut self.pending)? {
                return Ok(line);
            }
            let n = self.port.read(&mut buf).await?;
            if n == 0 {
                return Err(HardwareError::NotConnected);
            }
            self.pending.extend_from_slice(&buf[..n]);
        }
    }
}

/// Pop the first non-blank line off `pending`, leaving whatever follows it.
fn take_line(pending: &mut Vec<u8>) -> Result<Option<String>, HardwareError> {
    while let Some(end) = pending.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=end).collect();
        let line = String::from_utf8(raw)?;
        let line = line.trim();
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
    Ok(None)
}

fn check_reply(command: &str, response: &str) -> Result<(), HardwareError> {
    if response.starts_with("ok") {
        Ok(())
    } else {
        Err(HardwareError::Rejected {
            command: command.to_string(),
            response: response.to_string(),
        })
    }
}

fn pulse_command(channel: u8, pulse_us: u32) -> String {
    format!("set_pulse {} {}", channel, pulse_us)
}

fn frequency_command(hz: u32) -> String {
    format!("set_pwm_freq {}", hz)
}

#[async_trait]
impl PwmActuator for SerialPwm {
    async fn set_pulse(&self, channel: u8, pulse_us: u32) -> Result<(), HardwareError> {
        check_channel(channel)?;
        self.send_command(&pulse_command(channel, pulse_us)).await
    }

    async fn set_frequency(&self, hz: u32) -> Result<(), HardwareError> {
        self.send_command(&frequency_command(hz)).await
    }
}
