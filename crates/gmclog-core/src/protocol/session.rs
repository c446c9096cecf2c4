//! Device session
//!
//! Owns the channel and runs every command/response exchange under one lock.
//! The lock is held across write, settle delay and read, so no other task can
//! slip a command into the device's processing window.

use std::io::Write;
use std::sync::OnceLock;

use chrono::{Local, NaiveDateTime};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    channel::{read_available, read_line, read_up_to},
    codec, Command, DeviceChannel, FrameError, ProtocolError, SERIAL_ID_LEN, UNKNOWN_SERIAL,
};
use crate::device::{BatterySample, CountReading, DeviceIdentity};

/// Session behaviour fixed at startup
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Log raw reply bytes at info level instead of debug
    pub verbose: bool,
}

/// Exclusive owner of the link to one detector
pub struct DeviceSession<C> {
    channel: Mutex<C>,
    identity: OnceLock<DeviceIdentity>,
    config: SessionConfig,
}

impl<C: DeviceChannel> DeviceSession<C> {
    /// Take ownership of an open channel
    pub fn new(channel: C, config: SessionConfig) -> Self {
        Self {
            channel: Mutex::new(channel),
            identity: OnceLock::new(),
            config,
        }
    }

    /// Identity fetched by [`identify`](Self::identify), if it has run
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.get()
    }

    /// Query firmware version and serial number.
    ///
    /// Runs two separate exchanges, each with its own settle time. A short
    /// serial reply degrades to "Unknown"; a channel failure is returned.
    /// Only the first successful call talks to the device.
    pub async fn identify(&self) -> Result<DeviceIdentity, ProtocolError> {
        if let Some(identity) = self.identity.get() {
            return Ok(identity.clone());
        }

        let version = self.query_version().await?;
        let serial = self.query_serial().await?;

        let identity = DeviceIdentity { serial, version };
        info!(serial = %identity.serial, version = %identity.version, "device identified");
        Ok(self.identity.get_or_init(|| identity).clone())
    }

    async fn query_version(&self) -> Result<String, ProtocolError> {
        let mut channel = self.channel.lock().await;

        channel.write_all(&Command::LineReset.to_bytes())?;
        tokio::time::sleep(Command::LineReset.settle_time()).await;
        channel.write_all(&Command::GetVersion.to_bytes())?;
        tokio::time::sleep(Command::GetVersion.settle_time()).await;

        let line = read_line(&mut *channel)?;
        self.trace_reply(Command::GetVersion, &line);
        Ok(codec::decode_version(&line))
    }

    async fn query_serial(&self) -> Result<String, ProtocolError> {
        let mut channel = self.channel.lock().await;

        channel.write_all(&Command::GetSerial.to_bytes())?;
        tokio::time::sleep(Command::GetSerial.settle_time()).await;

        let reply = read_up_to(&mut *channel, SERIAL_ID_LEN)?;
        self.trace_reply(Command::GetSerial, &reply);
        Ok(codec::decode_identity_serial(&reply).unwrap_or_else(|e| {
            warn!("serial number unavailable: {e}");
            UNKNOWN_SERIAL.to_string()
        }))
    }

    /// Push wall-clock time to the device. No reply is expected.
    pub async fn sync_clock(&self, now: NaiveDateTime) -> Result<(), ProtocolError> {
        let frame = codec::encode_set_datetime(&now);
        let mut channel = self.channel.lock().await;
        channel.write_all(&frame)?;
        channel.flush()?;
        info!(
            command = %String::from_utf8_lossy(&frame),
            "device clock set"
        );
        Ok(())
    }

    /// Read the battery voltage.
    ///
    /// Out-of-range values come back as `Frame(OutOfRange)` so the caller can
    /// tell an implausible sample from a missing one.
    pub async fn sample_battery(&self) -> Result<BatterySample, ProtocolError> {
        let reply = self.exchange(Command::GetVoltage).await?;
        let byte = match reply.as_slice() {
            [b] => *b,
            other => {
                return Err(FrameError::ShortFrame {
                    expected: 1,
                    actual: other.len(),
                }
                .into())
            }
        };
        let voltage = codec::decode_battery(byte)?;
        Ok(BatterySample {
            voltage,
            valid_at: Local::now(),
        })
    }

    /// Read the current count rate.
    ///
    /// Marker, short and empty replies are returned as frame errors; the next
    /// scheduled poll is the retry.
    pub async fn sample_count(&self) -> Result<CountReading, ProtocolError> {
        let reply = self.exchange(Command::GetCpm).await?;
        let raw_code = codec::decode_count(&reply)?;
        Ok(CountReading {
            raw_code,
            captured_at: Local::now(),
        })
    }

    /// One locked query: clear input, write, settle, read the reply
    async fn exchange(&self, command: Command) -> Result<Vec<u8>, ProtocolError> {
        let mut channel = self.channel.lock().await;

        channel.clear_input_buffer()?;
        channel.write_all(&command.to_bytes())?;
        tokio::time::sleep(command.settle_time()).await;

        let reply = match command {
            Command::GetCpm => read_available(&mut *channel, 2)?,
            _ => read_up_to(&mut *channel, command.reply_len().unwrap_or(1))?,
        };
        self.trace_reply(command, &reply);
        Ok(reply)
    }

    fn trace_reply(&self, command: Command, reply: &[u8]) {
        if self.config.verbose {
            info!(command = command.name(), raw = ?reply, "reply");
        } else {
            debug!(command = command.name(), raw = ?reply, "reply");
        }
    }
}
