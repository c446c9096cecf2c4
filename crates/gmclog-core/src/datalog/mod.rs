//! Data Logging
//!
//! Turns count readings into records and appends them to a durable sink.

mod format;
mod memory;
mod writer;

pub use format::LogFormat;
pub use memory::MemorySink;
pub use writer::{open_sink, CsvSink, JsonLinesSink};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::{CountReading, DeviceIdentity};
use crate::protocol::codec::dose_rate_usv_per_hour;

/// Placeholder written when no valid battery sample is known
pub const UNKNOWN_BATTERY: &str = "unknown";

/// Column names, in file order
pub const HEADER: [&str; 7] = [
    "Timestamp",
    "CPM",
    "uSv/h",
    "Battery Voltage",
    "Location",
    "Device Serial",
    "Device Version",
];

/// Errors raised while persisting records
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One logged count poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// When the count was captured
    pub timestamp: DateTime<Local>,
    /// Counts per minute
    pub counts_per_minute: u16,
    /// Dose rate in µSv/h, rounded to 2 decimals
    pub dose_rate_usv_h: f64,
    /// Last valid battery voltage, if any
    pub battery_voltage: Option<f64>,
    /// Fixed location label
    pub location: String,
    /// Device serial number
    pub device_serial: String,
    /// Device firmware version
    pub device_version: String,
}

impl Record {
    /// Build a record from a fresh reading and the current shared state
    pub fn from_reading(
        reading: &CountReading,
        battery_voltage: Option<f64>,
        identity: &DeviceIdentity,
        location: &str,
    ) -> Self {
        Self {
            timestamp: reading.captured_at,
            counts_per_minute: reading.raw_code,
            dose_rate_usv_h: dose_rate_usv_per_hour(reading.raw_code),
            battery_voltage,
            location: location.to_string(),
            device_serial: identity.serial.clone(),
            device_version: identity.version.clone(),
        }
    }

    /// Battery voltage as written to the log: 2 decimals or "unknown"
    pub fn battery_field(&self) -> String {
        match self.battery_voltage {
            Some(v) => format!("{:.2}", v),
            None => UNKNOWN_BATTERY.to_string(),
        }
    }

    /// Column values in [`HEADER`] order
    pub fn fields(&self) -> [String; 7] {
        [
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            self.counts_per_minute.to_string(),
            format!("{:.2}", self.dose_rate_usv_h),
            self.battery_field(),
            self.location.clone(),
            self.device_serial.clone(),
            self.device_version.clone(),
        ]
    }
}

/// Append-only destination for records
pub trait RecordSink: Send {
    /// Persist one record
    fn append(&mut self, record: &Record) -> Result<(), SinkError>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        (**self).append(record)
    }
}
