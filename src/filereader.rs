//! The WARC file engine's read path.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use crate::countingreader::CountingReader;
use crate::error::Result;
use crate::record::{Validation, WarcRecord};
use crate::unmarshal::{Unmarshaler, WarcUnmarshaler};

const READ_BUFFER_SIZE: usize = 4 * 1024;

/// One record yielded by a [`WarcFileReader`].
#[derive(Debug)]
pub struct RecordEntry {
    pub record: WarcRecord,
    /// Absolute byte offset of the record within the file. For compressed
    /// files this is the offset of the record's gzip member, so the record
    /// can be re-read directly from it.
    pub offset: u64,
    pub validation: Validation,
}

/// Streams records from a WARC file, tracking each record's file offset.
pub struct WarcFileReader {
    reader: BufReader<CountingReader<File>>,
    unmarshaler: Box<dyn Unmarshaler>,
    initial_offset: u64,
}

impl WarcFileReader {
    /// Opens `path` for reading, starting at byte `offset`.
    pub fn open(path: impl AsRef<Path>, offset: u64) -> Result<Self> {
        Self::with_unmarshaler(path, offset, Box::new(WarcUnmarshaler))
    }

    pub fn with_unmarshaler(
        path: impl AsRef<Path>,
        offset: u64,
        unmarshaler: Box<dyn Unmarshaler>,
    ) -> Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let reader = BufReader::with_capacity(READ_BUFFER_SIZE, CountingReader::new(file));
        Ok(Self {
            reader,
            unmarshaler,
            initial_offset: offset,
        })
    }

    /// Yields the next record, or `Ok(None)` at end of stream.
    pub fn next(&mut self) -> Result<Option<RecordEntry>> {
        // Absolute file position: bytes pulled from disk minus what is still
        // sitting unread in the buffer.
        let position = self.initial_offset + self.reader.get_ref().bytes_read()
            - self.reader.buffer().len() as u64;

        match self.unmarshaler.unmarshal(&mut self.reader)? {
            Some((record, record_offset, validation)) => Ok(Some(RecordEntry {
                record,
                offset: position + record_offset,
                validation,
            })),
            None => Ok(None),
        }
    }

    /// Closes the underlying file.
    pub fn close(self) -> Result<()> {
        drop(self);
        Ok(())
    }
}
