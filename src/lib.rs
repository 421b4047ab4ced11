//! Toolkit for writing, reading and indexing WARC (ISO 28500) files.
//!
//! The write path marshals records into rolling, optionally gzip-compressed
//! files with a bounded size, publishing each file atomically when it closes.
//! The read path streams records back with exact byte offsets so any record
//! can be re-read directly. An index worker watches published files and feeds
//! record locations to a pluggable index.

pub mod clock;
mod countingreader;
pub mod error;
mod filereader;
mod filewriter;
mod indexer;
mod marshal;
mod namegen;
pub mod record;
pub mod timestamp;
mod unmarshal;

pub use clock::{Clock, FixedClock, SystemClock};
pub use countingreader::CountingReader;
pub use error::{Error, Result};
pub use filereader::{RecordEntry, WarcFileReader};
pub use filewriter::{WarcFileWriter, WarcInfoFunc, WriteOutcome, WriterOptions};
pub use indexer::{IndexWorker, RecordIndex};
pub use marshal::{Marshaler, WarcMarshaler};
pub use namegen::{FileNameGenerator, PatternNameGenerator, DEFAULT_PATTERN};
pub use record::{
    Block, RecordBuilder, RecordType, Validation, WarcHeaders, WarcRecord, WarcVersion,
};
pub use unmarshal::{Unmarshaler, WarcUnmarshaler};
