//! Protocol commands
//!
//! Defines the commands understood by GMC-300 series detectors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::codec::encode_command;

/// Protocol commands for detector communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Bare `\r\n` that resyncs the device's line parser
    LineReset,

    /// Firmware version string (`<GETVER>>`)
    GetVersion,

    /// 7-byte hardware serial number (`<GETSERIAL>>`)
    GetSerial,

    /// Set the device clock (`<SETDATETIME...>>`), built by `encode_set_datetime`
    SetDateTime,

    /// Battery voltage in tenths of a volt (`<GETVOLT>>`)
    GetVoltage,

    /// Current counts per minute (`<GETCPM>>`)
    GetCpm,
}

impl Command {
    /// Protocol name used inside the `<...>>` frame
    pub fn name(&self) -> &'static str {
        match self {
            Command::LineReset => "",
            Command::GetVersion => "GETVER",
            Command::GetSerial => "GETSERIAL",
            Command::SetDateTime => "SETDATETIME",
            Command::GetVoltage => "GETVOLT",
            Command::GetCpm => "GETCPM",
        }
    }

    /// Wire bytes for commands that take no fields
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Command::LineReset => b"\r\n".to_vec(),
            other => encode_command(other.name(), &[]),
        }
    }

    /// Time the device needs between receiving the command and the reply being ready
    pub fn settle_time(&self) -> Duration {
        match self {
            Command::LineReset => Duration::from_millis(200),
            Command::GetCpm => Duration::from_secs(2), // needs the full window to prepare the frame
            Command::SetDateTime => Duration::ZERO,
            _ => Duration::from_millis(500),
        }
    }

    /// Fixed reply length, if the reply has one
    pub fn reply_len(&self) -> Option<usize> {
        match self {
            Command::GetSerial => Some(super::SERIAL_ID_LEN),
            Command::GetVoltage => Some(1),
            Command::GetCpm => Some(2),
            _ => None,
        }
    }
}
