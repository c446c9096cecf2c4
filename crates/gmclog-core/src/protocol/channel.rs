//! Byte channel abstraction
//!
//! The session talks to anything that implements [`DeviceChannel`]: the real
//! serial port, the demo simulator, or a fake in tests.

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// Longest version line accepted before giving up on a terminator
const MAX_LINE_LEN: usize = 256;

/// Abstraction for the half-duplex link to the detector.
///
/// Read timeouts are fixed when the channel is opened. Not reentrant: callers must serialize access (the session does).
pub trait DeviceChannel: Read + Write + Send {
    /// Discard anything the device sent that nobody read
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Get number of bytes available to read
    fn bytes_to_read(&mut self) -> io::Result<u32>;
}

/// Serial port wrapper implementing DeviceChannel
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an already opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl DeviceChannel for SerialChannel {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::other)
    }
}

impl<C: DeviceChannel + ?Sized> DeviceChannel for Box<C> {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        (**self).clear_input_buffer()
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        (**self).bytes_to_read()
    }
}

/// Read up to `n` bytes, stopping early when the channel times out.
///
/// A timeout is not an error here: the caller gets whatever arrived, possibly
/// nothing, and decides what a short reply means.
pub fn read_up_to<C: DeviceChannel + ?Sized>(channel: &mut C, n: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        match channel.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Read everything the device has queued, but wait for at least `min` bytes
pub fn read_available<C: DeviceChannel + ?Sized>(
    channel: &mut C,
    min: usize,
) -> io::Result<Vec<u8>> {
    let queued = channel.bytes_to_read()? as usize;
    read_up_to(channel, queued.max(min))
}

/// Read a `\n`-terminated line (terminator included), or what arrived before the timeout
pub fn read_line<C: DeviceChannel + ?Sized>(channel: &mut C) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while line.len() < MAX_LINE_LEN {
        match channel.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(line)
}
