//! # gmclog Core Library
//!
//! Core functionality for the gmclog Geiger counter logger.

#![warn(missing_docs)]

//!
//! This library provides:
//! - Command encoding and reply decoding for the GMC serial protocol
//! - A device session that serializes exchanges on the half-duplex link
//! - Periodic clock-sync, battery and count-rate polling
//! - Append-only record sinks (CSV, JSON lines, in-memory)
//! - A simulated detector for demo runs and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use gmclog_core::prelude::*;
//!
//! let channel = open_channel(&ConnectionConfig::new("/dev/ttyUSB0"))?;
//! let session = Arc::new(DeviceSession::new(channel, SessionConfig::default()));
//! let identity = session.identify().await?;
//!
//! let sink = CsvSink::open("geiger_log.csv")?;
//! let handles = PollScheduler::new(session, identity, "53.4096, -2.5737")
//!     .spawn(sink);
//! ```

pub mod battery;
pub mod datalog;
pub mod demo;
pub mod device;
pub mod protocol;
pub mod scheduler;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battery::BatteryCell;
    pub use crate::datalog::{
        CsvSink, JsonLinesSink, LogFormat, MemorySink, Record, RecordSink, SinkError,
    };
    pub use crate::demo::SimulatedDetector;
    pub use crate::device::{BatterySample, CountReading, DeviceIdentity};
    pub use crate::protocol::{
        open_channel, ConnectionConfig, DeviceChannel, DeviceSession, FrameError,
        ProtocolError, SessionConfig,
    };
    pub use crate::scheduler::{PollError, PollIntervals, PollScheduler, SchedulerHandles};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
