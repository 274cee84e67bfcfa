//! Trace playback reader.
//!
//! [`TraceReader`] reads entries from any `Read` source, decoding the
//! binary trace format. The header is validated on construction.

use std::io::Read;

use eventide_core::{Trace, TraceEntry};

use crate::codec::{decode_entry, decode_header};
use crate::error::ReplayError;
use crate::types::TraceHeader;

/// Reads a trace from a byte stream.
///
/// Any `Read` source works: a byte slice in tests, a buffered file
/// when checking a recorded run.
pub struct TraceReader<R: Read> {
    reader: R,
    header: TraceHeader,
    entries_read: u64,
}

impl<R: Read> TraceReader<R> {
    /// Open a trace stream, reading and validating the header.
    pub fn open(mut reader: R) -> Result<Self, ReplayError> {
        let header = decode_header(&mut reader)?;
        Ok(Self {
            reader,
            header,
            entries_read: 0,
        })
    }

    /// The header of the stream.
    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    /// Read the next entry, or `None` if the stream is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<TraceEntry>, ReplayError> {
        let entry = decode_entry(&mut self.reader)?;
        if entry.is_some() {
            self.entries_read += 1;
        }
        Ok(entry)
    }

    /// Number of entries read so far.
    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    /// Read every remaining entry into a [`Trace`].
    pub fn read_trace(self) -> Result<Trace, ReplayError> {
        self.entries().collect()
    }

    /// Convert into an entry iterator.
    pub fn entries(self) -> EntryIter<R> {
        EntryIter {
            reader: self.reader,
            done: false,
        }
    }
}

/// Iterator adapter over trace entries.
pub struct EntryIter<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> Iterator for EntryIter<R> {
    type Item = Result<TraceEntry, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode_entry(&mut self.reader) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::TraceWriter;
    use eventide_core::{Value, VirtualTime};

    fn encoded(n: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = TraceWriter::new(&mut buf, &TraceHeader::current(1)).unwrap();
        for i in 0..n {
            writer
                .write_entry(&TraceEntry {
                    seq: i,
                    time: VirtualTime(i * 10),
                    value: Value::Int(i as i64),
                })
                .unwrap();
        }
        drop(writer);
        buf
    }

    #[test]
    fn reads_entries_in_order() {
        let buf = encoded(3);
        let mut reader = TraceReader::open(buf.as_slice()).unwrap();
        assert_eq!(reader.header().config_hash, 1);
        for i in 0..3 {
            let entry = reader.next_entry().unwrap().unwrap();
            assert_eq!(entry.seq, i);
            assert_eq!(entry.time, VirtualTime(i * 10));
        }
        assert!(reader.next_entry().unwrap().is_none());
        assert_eq!(reader.entries_read(), 3);
    }

    #[test]
    fn empty_trace_reads_empty() {
        let buf = encoded(0);
        let trace = TraceReader::open(buf.as_slice()).unwrap().read_trace().unwrap();
        assert!(trace.is_empty());
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut buf = encoded(2);
        buf.truncate(buf.len() - 1);
        let results: Vec<_> = TraceReader::open(buf.as_slice()).unwrap().entries().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
