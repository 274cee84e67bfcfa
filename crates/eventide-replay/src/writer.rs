//! Trace recording writer.
//!
//! [`TraceWriter`] streams entries to any `Write` sink, encoding the
//! binary trace format. The header is written immediately on construction.

use std::io::Write;

use eventide_core::{Trace, TraceEntry};

use crate::codec::{encode_entry, encode_header};
use crate::error::ReplayError;
use crate::types::TraceHeader;

/// Writes a trace to a byte stream.
///
/// Any `Write` sink works: an in-memory `Vec<u8>`, or a buffered file
/// when recording a run for later replay.
///
/// # Examples
///
/// ```
/// use eventide_core::{Trace, Value, VirtualTime};
/// use eventide_replay::{TraceHeader, TraceReader, TraceWriter};
///
/// let mut trace = Trace::new();
/// trace.push(VirtualTime(0), Value::str("Start"));
/// trace.push(VirtualTime(10), Value::str("Timeout"));
///
/// let header = TraceHeader::current(0);
/// let mut buf = Vec::new();
/// let mut writer = TraceWriter::new(&mut buf, &header).unwrap();
/// writer.write_trace(&trace).unwrap();
/// assert_eq!(writer.entries_written(), 2);
/// drop(writer);
///
/// let reader = TraceReader::open(buf.as_slice()).unwrap();
/// assert_eq!(reader.header(), &header);
/// assert_eq!(reader.read_trace().unwrap(), trace);
/// ```
pub struct TraceWriter<W: Write> {
    writer: W,
    entries_written: u64,
}

impl<W: Write> TraceWriter<W> {
    /// Create a new writer, immediately writing the header.
    pub fn new(mut writer: W, header: &TraceHeader) -> Result<Self, ReplayError> {
        encode_header(&mut writer, header)?;
        Ok(Self {
            writer,
            entries_written: 0,
        })
    }

    /// Append one entry.
    pub fn write_entry(&mut self, entry: &TraceEntry) -> Result<(), ReplayError> {
        encode_entry(&mut self.writer, entry)?;
        self.entries_written += 1;
        Ok(())
    }

    /// Append every entry of `trace`.
    pub fn write_trace(&mut self, trace: &Trace) -> Result<(), ReplayError> {
        for entry in trace {
            self.write_entry(entry)?;
        }
        Ok(())
    }

    /// Number of entries written so far.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), ReplayError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W, ReplayError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_core::{Value, VirtualTime};

    #[test]
    fn counts_entries_and_returns_sink() {
        let mut trace = Trace::new();
        for i in 0..3 {
            trace.push(VirtualTime(i), Value::Int(i as i64));
        }
        let mut writer = TraceWriter::new(Vec::new(), &TraceHeader::current(7)).unwrap();
        writer.write_trace(&trace).unwrap();
        assert_eq!(writer.entries_written(), 3);
        let bytes = writer.into_inner().unwrap();
        assert_eq!(&bytes[..4], b"EVTR");
    }
}
