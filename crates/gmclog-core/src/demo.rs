//! Demo Mode - Simulated GMC detector for testing
//!
//! Answers the same commands as a real GMC-300 over an in-memory channel, so
//! the logger can run end to end without hardware. Background level sits
//! around 20 CPM with Poisson-like jitter and an occasional `0xAA` marker
//! instead of a count frame.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::protocol::{Command, DeviceChannel, MARKER_BYTE};

/// Firmware string reported by the simulator
pub const DEMO_VERSION: &str = "GMC-300Re 4.54";

/// Serial number reported by the simulator
pub const DEMO_SERIAL: [u8; 7] = [0xF4, 0x88, 0x12, 0x00, 0x3B, 0x0A, 0x7C];

/// In-memory detector that implements [`DeviceChannel`]
pub struct SimulatedDetector {
    /// Bytes waiting to be read
    rx: VecDeque<u8>,
    /// Partial command text written so far
    pending: Vec<u8>,
    /// Mean background CPM
    background_cpm: f64,
    /// Battery voltage in tenths of a volt
    battery_tenths: u8,
    /// Chance of answering GETCPM with the marker byte
    marker_probability: f64,
    /// Last clock value pushed by SETDATETIME (raw fields)
    clock: Option<[u8; 6]>,
    rng: StdRng,
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDetector {
    /// Create a simulator seeded from entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rx: VecDeque::new(),
            pending: Vec::new(),
            background_cpm: 20.0,
            battery_tenths: 41,
            marker_probability: 0.05,
            clock: None,
            rng,
        }
    }

    /// Override the mean CPM
    pub fn with_background(mut self, cpm: f64) -> Self {
        self.background_cpm = cpm.clamp(0.0, 16383.0);
        self
    }

    /// Override the marker-byte probability
    pub fn with_marker_probability(mut self, p: f64) -> Self {
        self.marker_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Last SETDATETIME fields received (YY, MM, DD, hh, mm, ss)
    pub fn clock(&self) -> Option<[u8; 6]> {
        self.clock
    }

    /// Consume complete commands from the pending buffer
    fn process_pending(&mut self) {
        loop {
            // Line resets may precede a command
            while matches!(self.pending.first(), Some(b'\r') | Some(b'\n')) {
                self.pending.remove(0);
            }
            let Some(end) = self.pending.windows(2).position(|w| w == b">>") else {
                return;
            };
            let frame: Vec<u8> = self.pending.drain(..end + 2).collect();
            self.respond(&frame);
        }
    }

    fn respond(&mut self, frame: &[u8]) {
        let text = String::from_utf8_lossy(frame);
        let body = text.trim_start_matches('<').trim_end_matches(">>");

        if body == Command::GetVersion.name() {
            self.rx.extend(DEMO_VERSION.as_bytes());
            self.rx.extend(b"\r\n");
        } else if body == Command::GetSerial.name() {
            self.rx.extend(DEMO_SERIAL);
        } else if body == Command::GetVoltage.name() {
            self.rx.push_back(self.battery_tenths);
        } else if body == Command::GetCpm.name() {
            self.push_count_frame();
        } else if let Some(fields) = body.strip_prefix(Command::SetDateTime.name()) {
            self.clock = parse_clock_fields(fields);
        } else {
            tracing::debug!(command = %body, "simulator ignoring unknown command");
        }
    }

    fn push_count_frame(&mut self) {
        if self.rng.gen_bool(self.marker_probability) {
            self.rx.push_back(MARKER_BYTE);
            return;
        }
        // Normal approximation of Poisson noise around the background level
        let spread = self.background_cpm.sqrt();
        let jitter = self.rng.gen_range(-2.0..=2.0) * spread;
        let cpm = (self.background_cpm + jitter).round().clamp(0.0, 16383.0) as u16;
        self.rx.extend(cpm.to_be_bytes());

        // Battery drifts down slowly; stays within the plausible range
        if self.rng.gen_ratio(1, 200) && self.battery_tenths > 33 {
            self.battery_tenths -= 1;
        }
    }
}

fn parse_clock_fields(fields: &str) -> Option<[u8; 6]> {
    if fields.len() != 12 {
        return None;
    }
    let mut out = [0u8; 6];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = u8::from_str_radix(fields.get(i * 2..i * 2 + 2)?, 16).ok()?;
    }
    Some(out)
}

impl Read for SimulatedDetector {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.rx.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedDetector {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.process_pending();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DeviceChannel for SimulatedDetector {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.rx.clear();
        Ok(())
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.rx.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{codec, read_line, read_up_to};

    #[test]
    fn test_answers_identity_queries() {
        let mut sim = SimulatedDetector::seeded(1);
        sim.write_all(b"\r\n").unwrap();
        sim.write_all(b"<GETVER>>").unwrap();
        let line = read_line(&mut sim).unwrap();
        assert_eq!(codec::decode_version(&line), DEMO_VERSION);

        sim.write_all(b"<GETSERIAL>>").unwrap();
        let serial = read_up_to(&mut sim, 7).unwrap();
        assert_eq!(
            codec::decode_identity_serial(&serial).unwrap(),
            "F48812003B0A7C"
        );
    }

    #[test]
    fn test_count_frames_stay_in_range() {
        let mut sim = SimulatedDetector::seeded(7)
            .with_background(50.0)
            .with_marker_probability(0.0);
        for _ in 0..200 {
            sim.write_all(b"<GETCPM>>").unwrap();
            let frame = read_up_to(&mut sim, 2).unwrap();
            let cpm = codec::decode_count(&frame).unwrap();
            assert!(cpm <= 100, "cpm {cpm} too far from background");
        }
    }

    #[test]
    fn test_marker_only_mode() {
        let mut sim = SimulatedDetector::seeded(3).with_marker_probability(1.0);
        sim.write_all(b"<GETCPM>>").unwrap();
        assert_eq!(read_up_to(&mut sim, 2).unwrap(), vec![MARKER_BYTE]);
    }

    #[test]
    fn test_battery_is_plausible() {
        let mut sim = SimulatedDetector::seeded(5);
        sim.write_all(b"<GETVOLT>>").unwrap();
        let reply = read_up_to(&mut sim, 1).unwrap();
        assert!(codec::decode_battery(reply[0]).is_ok());
    }

    #[test]
    fn test_records_clock() {
        let mut sim = SimulatedDetector::seeded(9);
        sim.write_all(b"<SETDATETIME1803050E0709>>").unwrap();
        assert_eq!(sim.clock(), Some([0x18, 0x03, 0x05, 0x0E, 0x07, 0x09]));
        assert_eq!(sim.bytes_to_read().unwrap(), 0);
    }

    #[test]
    fn test_command_split_across_writes() {
        let mut sim = SimulatedDetector::seeded(11);
        sim.write_all(b"<GETV").unwrap();
        assert_eq!(sim.bytes_to_read().unwrap(), 0);
        sim.write_all(b"OLT>>").unwrap();
        assert_eq!(sim.bytes_to_read().unwrap(), 1);
    }
}
