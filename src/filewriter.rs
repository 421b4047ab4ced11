//! The WARC file engine's write path.
//!
//! A [`WarcFileWriter`] owns a fixed set of single-file writers, each bound to
//! one worker thread. Producers hand records to a shared rendezvous channel;
//! whichever worker is idle claims the job, so a producer blocks exactly until
//! a worker has accepted its record.
//!
//! Each single-file writer keeps one output file open at a time. Files are
//! created with an open-suffix and atomically renamed on close; the rename is
//! the publish step downstream indexers key on. A file rolls before a record
//! that would overflow the size ceiling, never after.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::marshal::{Marshaler, WarcMarshaler};
use crate::namegen::{FileNameGenerator, PatternNameGenerator};
use crate::record::header::{
    APPLICATION_WARC_FIELDS, CONTENT_LENGTH, CONTENT_TYPE, WARC_FILENAME, WARC_RECORD_ID,
    WARC_WARCINFO_ID,
};
use crate::record::{RecordBuilder, RecordType, WarcRecord};

/// Populates the per-file warcinfo record before it is written.
pub type WarcInfoFunc = Arc<dyn Fn(&mut RecordBuilder) -> Result<()> + Send + Sync>;

/// Write-path configuration. Field defaults are part of the contract.
pub struct WriterOptions {
    /// Soft size ceiling per file; a file rolls before a record that would
    /// overflow it. `0` disables rolling.
    pub max_file_size: u64,
    /// Wrap each record in its own gzip member.
    pub compress: bool,
    /// Estimated compressed/uncompressed ratio, used to project the on-disk
    /// size of a record before it is written.
    pub expected_compression_ratio: f64,
    /// Split records larger than the file budget across files.
    pub use_segmentation: bool,
    /// Appended to generated basenames when compressing.
    pub compress_suffix: String,
    /// Appended to the on-disk name while a file is open for writing.
    pub open_file_suffix: String,
    /// Number of writers (and worker threads) in the pool.
    pub max_concurrent_writers: usize,
    pub name_generator: Arc<dyn FileNameGenerator>,
    pub marshaler: Arc<dyn Marshaler>,
    /// When set, every new file starts with a warcinfo record and subsequent
    /// records are stamped with its id.
    pub warc_info_func: Option<WarcInfoFunc>,
    pub clock: Arc<dyn Clock>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024,
            compress: true,
            expected_compression_ratio: 0.5,
            use_segmentation: false,
            compress_suffix: ".gz".to_string(),
            open_file_suffix: ".open".to_string(),
            max_concurrent_writers: 1,
            name_generator: Arc::new(PatternNameGenerator::default()),
            marshaler: Arc::new(WarcMarshaler),
            warc_info_func: None,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Result of one record write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Byte offset of the record within its file. For a segmented record,
    /// the offset of the first segment.
    pub offset: u64,
    /// Public basename of the file the record (first segment) landed in.
    pub file_name: String,
    /// Total uncompressed bytes written, all segments included.
    pub bytes_written: u64,
}

struct Job {
    record: WarcRecord,
    reply: mpsc::SyncSender<Result<WriteOutcome>>,
}

/// Concurrent WARC file writer.
///
/// Closing is separate from shutdown: `close` finishes the current files but
/// leaves the pool usable (a later write opens fresh files), while `shutdown`
/// consumes the pool and releases its workers.
pub struct WarcFileWriter {
    writers: Vec<Arc<SingleFileWriter>>,
    jobs: mpsc::SyncSender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WarcFileWriter {
    pub fn new(options: WriterOptions) -> Result<Self> {
        let options = Arc::new(options);
        let (jobs, rx) = mpsc::sync_channel::<Job>(0);
        let rx = Arc::new(Mutex::new(rx));

        let count = options.max_concurrent_writers.max(1);
        let mut writers = Vec::with_capacity(count);
        let mut workers = Vec::with_capacity(count);
        for i in 0..count {
            let writer = Arc::new(SingleFileWriter::new(Arc::clone(&options)));
            writers.push(Arc::clone(&writer));
            let rx = Arc::clone(&rx);
            let handle = thread::Builder::new()
                .name(format!("warc-writer-{i}"))
                .spawn(move || worker(writer, rx))
                .map_err(Error::Io)?;
            workers.push(handle);
        }

        Ok(Self {
            writers,
            jobs,
            workers,
        })
    }

    /// Writes one record, blocking until a worker has completed it.
    pub fn write(&self, record: WarcRecord) -> Result<WriteOutcome> {
        let (reply, outcome) = mpsc::sync_channel(1);
        self.jobs
            .send(Job { record, reply })
            .map_err(|_| Error::Shutdown)?;
        outcome.recv().map_err(|_| Error::Shutdown)?
    }

    /// Closes the file currently open in every writer, publishing each via
    /// rename. Later writes open fresh files.
    pub fn close(&self) -> Result<()> {
        close_writers(&self.writers)
    }

    /// Releases the workers (draining in-flight jobs), then closes every
    /// writer. Consumes the pool; further writes are unrepresentable.
    pub fn shutdown(self) -> Result<()> {
        let Self {
            writers,
            jobs,
            workers,
        } = self;
        drop(jobs);
        for handle in workers {
            let _ = handle.join();
        }
        close_writers(&writers)
    }
}

fn close_writers(writers: &[Arc<SingleFileWriter>]) -> Result<()> {
    let mut errors = Vec::new();
    for writer in writers {
        if let Err(err) = writer.close() {
            errors.push(err);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Close(errors))
    }
}

fn worker(writer: Arc<SingleFileWriter>, jobs: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = {
            let rx = match jobs.lock() {
                Ok(rx) => rx,
                Err(_) => return,
            };
            rx.recv()
        };
        match job {
            Ok(job) => {
                let result = writer.write(job.record);
                if let Err(err) = &result {
                    log::warn!("record write failed: {err}");
                }
                let _ = job.reply.send(result);
            }
            Err(_) => return,
        }
    }
}

#[derive(Default)]
struct WriterState {
    file: Option<File>,
    /// Public basename, without the open-suffix.
    file_name: String,
    /// On-disk path while open (carries the open-suffix).
    open_path: PathBuf,
    /// Observed size after the last completed write; authoritative for rolls.
    file_size: u64,
    /// Id of the warcinfo record heading the current file, empty when none.
    warcinfo_id: String,
}

struct SingleFileWriter {
    options: Arc<WriterOptions>,
    state: Mutex<WriterState>,
}

impl SingleFileWriter {
    fn new(options: Arc<WriterOptions>) -> Self {
        Self {
            options,
            state: Mutex::new(WriterState::default()),
        }
    }

    fn write(&self, record: WarcRecord) -> Result<WriteOutcome> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::State("writer lock poisoned"))?;

        let opts = &self.options;
        let max_record_size = if opts.use_segmentation && opts.max_file_size > 0 {
            if opts.compress {
                (opts.max_file_size as f64 / opts.expected_compression_ratio) as u64
            } else {
                opts.max_file_size
            }
        } else {
            0
        };

        let mut record = record;
        let mut first: Option<(u64, String)> = None;
        let mut bytes_written = 0u64;
        loop {
            // Roll before the record when its declared size would overflow
            // the ceiling. The file_size > 0 guard keeps a record larger than
            // the whole budget from forcing an empty-file roll loop.
            if state.file.is_some() && opts.max_file_size > 0 {
                if let Some(s) = record.headers().get(CONTENT_LENGTH) {
                    let declared: u64 = s
                        .parse()
                        .map_err(|_| Error::BadHeader(format!("invalid Content-Length: {s}")))?;
                    let projected = if opts.compress {
                        (declared as f64 * opts.expected_compression_ratio) as u64
                    } else {
                        declared
                    };
                    if state.file_size > 0 && state.file_size + projected > opts.max_file_size {
                        Self::close_current(&mut state)?;
                    }
                }
            }

            if state.file.is_none() {
                self.create_file(&mut state)?;
            }

            let offset = state.file_size;
            if first.is_none() {
                first = Some((offset, state.file_name.clone()));
            }

            let (continuation, written) =
                self.write_record(&mut state, &mut record, max_record_size)?;
            bytes_written += written;

            let file = state
                .file
                .as_mut()
                .ok_or(Error::State("file handle missing after write"))?;
            // Narrow the window for half-written records on crash.
            file.sync_all()?;
            state.file_size = file.metadata()?.len();

            match continuation {
                Some(next) => record = next,
                None => break,
            }
        }

        let (offset, file_name) = first.ok_or(Error::State("write completed without a file"))?;
        Ok(WriteOutcome {
            offset,
            file_name,
            bytes_written,
        })
    }

    fn create_file(&self, state: &mut WriterState) -> Result<()> {
        let opts = &self.options;
        let (dir, mut name) = opts.name_generator.next_name();
        if opts.compress {
            name.push_str(&opts.compress_suffix);
        }
        let open_path = dir.join(format!("{name}{}", opts.open_file_suffix));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&open_path)?;
        state.file = Some(file);
        state.file_name = name;
        state.open_path = open_path;
        state.file_size = 0;
        state.warcinfo_id.clear();

        if opts.warc_info_func.is_some() {
            if let Err(err) = self.write_warcinfo(state) {
                // The caller sees the failure; stay in the no-file state.
                state.file = None;
                state.file_name.clear();
                state.open_path = PathBuf::new();
                return Err(err);
            }
        }
        Ok(())
    }

    fn write_warcinfo(&self, state: &mut WriterState) -> Result<()> {
        let opts = &self.options;
        let info_func = opts
            .warc_info_func
            .as_ref()
            .ok_or(Error::State("warcinfo requested without a populator"))?;

        let mut builder = RecordBuilder::with_clock(RecordType::Warcinfo, Arc::clone(&opts.clock));
        builder.header(WARC_FILENAME, &state.file_name);
        builder.header(CONTENT_TYPE, APPLICATION_WARC_FIELDS);
        info_func(&mut builder)?;
        let mut info = builder.build()?;

        // The info record must not be stamped with its own id.
        state.warcinfo_id.clear();
        self.write_record(state, &mut info, 0)?;
        state.warcinfo_id = info
            .headers()
            .get(WARC_RECORD_ID)
            .unwrap_or("")
            .to_string();

        let file = state
            .file
            .as_mut()
            .ok_or(Error::State("file handle missing after write"))?;
        file.sync_all()?;
        state.file_size = file.metadata()?.len();
        Ok(())
    }

    fn write_record(
        &self,
        state: &mut WriterState,
        record: &mut WarcRecord,
        max_record_size: u64,
    ) -> Result<(Option<WarcRecord>, u64)> {
        if !state.warcinfo_id.is_empty() {
            let id = state.warcinfo_id.clone();
            record.headers_mut().set(WARC_WARCINFO_ID, &id);
        }
        let opts = &self.options;
        let file = state
            .file
            .as_mut()
            .ok_or(Error::State("no open file"))?;
        if opts.compress {
            // A fresh gzip member per record keeps every record individually
            // decodable from its file offset.
            let mut encoder = GzEncoder::new(&mut *file, Compression::default());
            let result = opts.marshaler.marshal(&mut encoder, record, max_record_size);
            let finish = encoder.finish();
            let (continuation, written) = result?;
            finish?;
            Ok((continuation, written))
        } else {
            opts.marshaler.marshal(file, record, max_record_size)
        }
    }

    fn close(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::State("writer lock poisoned"))?;
        Self::close_current(&mut state)
    }

    /// Closes and publishes the current file. Idempotent when no file is open.
    fn close_current(state: &mut WriterState) -> Result<()> {
        if state.file.take().is_some() {
            let open_path = std::mem::take(&mut state.open_path);
            let file_name = std::mem::take(&mut state.file_name);
            state.file_size = 0;
            state.warcinfo_id.clear();

            let published = match open_path.parent() {
                Some(parent) => parent.join(&file_name),
                None => PathBuf::from(&file_name),
            };
            std::fs::rename(&open_path, &published)?;
            log::info!("published {}", published.display());
        }
        Ok(())
    }
}
