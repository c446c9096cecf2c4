//! File-backed record sinks

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use super::format::csv_row;
use super::{LogFormat, Record, RecordSink, SinkError, HEADER};

/// Append-only CSV log.
///
/// The header row is written only when the file is created, so reopening an
/// existing log never duplicates it.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Open (creating with a header if needed) the log at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref();

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{}", csv_row(&HEADER))?;
                file.flush()?;
                info!(path = %path.display(), "created record log");
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "appending to existing record log");
            }
            Err(e) => return Err(e.into()),
        }

        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        writeln!(self.writer, "{}", csv_row(&record.fields()))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Append-only JSON lines log, one serialized [`Record`] per line
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Open (creating if needed) the log at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for JsonLinesSink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Open the sink matching the path's extension
pub fn open_sink<P: AsRef<Path>>(path: P) -> Result<Box<dyn RecordSink>, SinkError> {
    let path = path.as_ref();
    Ok(match LogFormat::from_extension(path) {
        LogFormat::Csv => Box::new(CsvSink::open(path)?),
        LogFormat::JsonLines => Box::new(JsonLinesSink::open(path)?),
    })
}
