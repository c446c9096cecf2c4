//! Device state as seen by the logger

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::protocol::UNKNOWN_SERIAL;

/// Identity reported by the detector at session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// 14 uppercase hex characters, or "Unknown"
    pub serial: String,
    /// Firmware version string, trimmed
    pub version: String,
}

impl DeviceIdentity {
    /// Whether the serial number query failed
    pub fn has_unknown_serial(&self) -> bool {
        self.serial == UNKNOWN_SERIAL
    }
}

/// A battery voltage that passed the plausibility check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySample {
    /// Volts
    pub voltage: f64,
    /// When the sample was taken
    pub valid_at: DateTime<Local>,
}

/// One decoded `<GETCPM>>` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReading {
    /// Counts per minute, always within 14 bits
    pub raw_code: u16,
    /// When the reply was decoded
    pub captured_at: DateTime<Local>,
}
