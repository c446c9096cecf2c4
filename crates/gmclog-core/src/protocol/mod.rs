//! Serial Protocol Communication
//!
//! Implements the GMC command/response protocol: `<COMMAND>>` frames written to
//! the device, fixed-size binary or text replies read back.
//!
//! The device is half-duplex. Every exchange goes through [`DeviceSession`],
//! which holds the channel lock from the write until the reply has been read.

mod channel;
pub mod codec;
pub mod commands;
mod error;
pub mod serial;
mod session;

use std::time::Duration;

pub use channel::{read_available, read_line, read_up_to, DeviceChannel, SerialChannel};
pub use commands::Command;
pub use error::{FrameError, ProtocolError};
pub use serial::{first_port, list_ports, open_channel, open_port, ConnectionConfig, PortInfo};
pub use session::{DeviceSession, SessionConfig};

/// Default baud rate for GMC-300 series detectors
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Channel read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Settle time after opening the port, before the first command
pub const PORT_OPEN_SETTLE: Duration = Duration::from_secs(2);

/// Single-byte reply meaning "no new data" on `<GETCPM>>`
pub const MARKER_BYTE: u8 = 0xAA;

/// Only the low 14 bits of a count frame carry the CPM value
pub const COUNT_MASK: u16 = 0x3FFF;

/// Length of the `<GETSERIAL>>` reply
pub const SERIAL_ID_LEN: usize = 7;

/// Highest plausible battery voltage for the cell chemistry in use
pub const MAX_BATTERY_VOLTAGE: f64 = 5.0;

/// Serial id reported when the device does not answer `<GETSERIAL>>` in full
pub const UNKNOWN_SERIAL: &str = "Unknown";
