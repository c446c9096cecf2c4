//! Protocol errors

use thiserror::Error;

/// Anomalies in a reply frame.
///
/// None of these are fatal: the poll that produced one simply yields no value
/// for that cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("short frame: expected {expected} bytes, got {actual}")]
    ShortFrame { expected: usize, actual: usize },

    #[error("value out of range: {0:.2}")]
    OutOfRange(f64),

    #[error("marker byte 0xAA (no new data)")]
    MarkerByte,

    #[error("unexpected 1-byte reply: {0:#04x}")]
    UnexpectedShortFrame(u8),

    #[error("no data received")]
    NoData,
}

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("No serial port found")]
    PortNotFound,

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for reply-level anomalies, false for channel failures
    pub fn is_frame_anomaly(&self) -> bool {
        matches!(self, ProtocolError::Frame(_))
    }
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        ProtocolError::SerialError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_anomaly_classification() {
        assert!(ProtocolError::from(FrameError::MarkerByte).is_frame_anomaly());
        assert!(ProtocolError::from(FrameError::NoData).is_frame_anomaly());

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged");
        assert!(!ProtocolError::from(io).is_frame_anomaly());
        assert!(!ProtocolError::SerialError("gone".into()).is_frame_anomaly());
    }

    #[test]
    fn test_error_display() {
        let err = FrameError::UnexpectedShortFrame(0x12);
        assert_eq!(err.to_string(), "unexpected 1-byte reply: 0x12");

        let err = FrameError::ShortFrame {
            expected: 7,
            actual: 3,
        };
        assert_eq!(err.to_string(), "short frame: expected 7 bytes, got 3");
    }
}
