//! Scripted fake detector shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use gmclog_core::protocol::DeviceChannel;

pub const SERIAL_BYTES: [u8; 7] = [0x05, 0x30, 0x11, 0xA2, 0x00, 0x7E, 0xC4];
pub const SERIAL_HEX: &str = "053011A2007EC4";

#[derive(Default)]
struct State {
    /// Reply bytes of the exchange in progress
    rx: VecDeque<u8>,
    /// Command whose reply has not been fully read yet
    outstanding: Option<String>,
    /// Per-command queued replies; the default is used once a queue runs dry
    queued: HashMap<String, VecDeque<Vec<u8>>>,
    defaults: HashMap<String, Vec<u8>>,
    /// Every frame written, in order
    log: Vec<String>,
    violations: Vec<String>,
    /// Fail every read once this many GETCPM commands have been seen
    fail_after_cpm: Option<usize>,
    cpm_seen: usize,
    /// Fail GETVOLT reads once this many GETVOLT commands have been seen
    fail_volt_after: Option<usize>,
    volt_seen: usize,
    last_command: String,
}

/// Fake GMC detector that flags any write arriving while a reply is pending
#[derive(Clone, Default)]
pub struct FakeDetector(Arc<Mutex<State>>);

impl FakeDetector {
    /// Answers like a healthy device: version "Rev 1.2", 3.3 V, 100 CPM
    pub fn healthy() -> Self {
        Self::default()
            .default_reply("GETVER", b"Rev 1.2\r\n")
            .default_reply("GETSERIAL", &SERIAL_BYTES)
            .default_reply("GETVOLT", &[0x21])
            .default_reply("GETCPM", &[0x00, 0x64])
    }

    pub fn default_reply(self, command: &str, reply: &[u8]) -> Self {
        self.0
            .lock()
            .unwrap()
            .defaults
            .insert(command.to_string(), reply.to_vec());
        self
    }

    pub fn queue_reply(self, command: &str, reply: &[u8]) -> Self {
        self.0
            .lock()
            .unwrap()
            .queued
            .entry(command.to_string())
            .or_default()
            .push_back(reply.to_vec());
        self
    }

    pub fn fail_after_cpm(self, n: usize) -> Self {
        self.0.lock().unwrap().fail_after_cpm = Some(n);
        self
    }

    pub fn fail_volt_after(self, n: usize) -> Self {
        self.0.lock().unwrap().fail_volt_after = Some(n);
        self
    }

    pub fn violations(&self) -> Vec<String> {
        self.0.lock().unwrap().violations.clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.0.lock().unwrap().log.clone()
    }

    pub fn count_of(&self, command: &str) -> usize {
        self.log().iter().filter(|c| c.as_str() == command).count()
    }
}

fn command_name(frame: &[u8]) -> String {
    let text = String::from_utf8_lossy(frame);
    if text == "\r\n" {
        return "RESET".to_string();
    }
    let body = text.trim_start_matches('<').trim_end_matches(">>");
    if body.starts_with("SETDATETIME") {
        "SETDATETIME".to_string()
    } else {
        body.to_string()
    }
}

impl Write for FakeDetector {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut s = self.0.lock().unwrap();
        let name = command_name(buf);

        if let Some(pending) = s.outstanding.clone() {
            s.violations
                .push(format!("{name} written while {pending} reply was pending"));
        }
        s.log.push(name.clone());

        if name == "GETCPM" {
            s.cpm_seen += 1;
        }
        if name == "GETVOLT" {
            s.volt_seen += 1;
        }
        s.last_command = name.clone();

        let queued = s.queued.get_mut(&name).and_then(|q| q.pop_front());
        let reply = queued.or_else(|| s.defaults.get(&name).cloned());
        if let Some(reply) = reply {
            if !reply.is_empty() {
                s.rx.extend(reply);
                s.outstanding = Some(name);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for FakeDetector {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut s = self.0.lock().unwrap();
        if let Some(limit) = s.fail_after_cpm {
            if s.cpm_seen > limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
            }
        }
        if let Some(limit) = s.fail_volt_after {
            if s.last_command == "GETVOLT" && s.volt_seen > limit {
                s.rx.clear();
                s.outstanding = None;
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "read failed"));
            }
        }
        let n = buf.len().min(s.rx.len());
        if n == 0 {
            s.outstanding = None;
            return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        }
        for (slot, byte) in buf.iter_mut().zip(s.rx.drain(..n)) {
            *slot = byte;
        }
        if s.rx.is_empty() {
            s.outstanding = None;
        }
        Ok(n)
    }
}

impl DeviceChannel for FakeDetector {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        let mut s = self.0.lock().unwrap();
        if let Some(pending) = s.outstanding.take() {
            s.violations
                .push(format!("input cleared while {pending} reply was pending"));
        }
        s.rx.clear();
        Ok(())
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.0.lock().unwrap().rx.len() as u32)
    }
}
