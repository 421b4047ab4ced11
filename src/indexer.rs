//! Background indexing of published WARC files.
//!
//! The [`IndexWorker`] debounces change notifications per file: repeated
//! `queue` calls within the batch window collapse into one indexing pass, so
//! a file being appended to is read once after it settles. Expired entries
//! are handed to a bounded job channel consumed by worker threads; a worker
//! streams the whole file and feeds every record id and offset to the index.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::filereader::WarcFileReader;
use crate::record::header::WARC_RECORD_ID;

const JOB_QUEUE_DEPTH: usize = 10;

/// Destination for record locations extracted from a file.
///
/// Implementations decide the storage (an on-disk key-value store, an
/// in-memory map, a search service); the worker only feeds them.
pub trait RecordIndex: Send + Sync {
    fn add(&self, record_id: &str, file_name: &str, offset: u64) -> Result<()>;
    fn flush(&self) -> Result<()>;
}

struct SchedulerState {
    deadlines: HashMap<String, Instant>,
    stop: bool,
}

struct Pending {
    state: Mutex<SchedulerState>,
    wake: Condvar,
}

/// Debouncing index job dispatcher with a pool of worker threads.
pub struct IndexWorker {
    pending: Arc<Pending>,
    jobs: mpsc::SyncSender<String>,
    scheduler: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl IndexWorker {
    pub fn new(index: Arc<dyn RecordIndex>, worker_count: usize) -> Result<Self> {
        let pending = Arc::new(Pending {
            state: Mutex::new(SchedulerState {
                deadlines: HashMap::new(),
                stop: false,
            }),
            wake: Condvar::new(),
        });

        let (jobs, rx) = mpsc::sync_channel::<String>(JOB_QUEUE_DEPTH);
        let rx = Arc::new(Mutex::new(rx));

        let count = worker_count.max(1);
        let mut workers = Vec::with_capacity(count);
        for i in 0..count {
            let rx = Arc::clone(&rx);
            let index = Arc::clone(&index);
            let handle = thread::Builder::new()
                .name(format!("warc-index-{i}"))
                .spawn(move || loop {
                    let job = {
                        let rx = match rx.lock() {
                            Ok(rx) => rx,
                            Err(_) => return,
                        };
                        rx.recv()
                    };
                    match job {
                        Ok(file_name) => index_file(index.as_ref(), &file_name),
                        Err(_) => return,
                    }
                })?;
            workers.push(handle);
        }

        let scheduler = {
            let pending = Arc::clone(&pending);
            let jobs = jobs.clone();
            thread::Builder::new()
                .name("warc-index-timer".to_string())
                .spawn(move || run_scheduler(pending, jobs))?
        };

        log::info!("index worker started with {count} instance(s)");
        Ok(Self {
            pending,
            jobs,
            scheduler: Some(scheduler),
            workers,
        })
    }

    /// Schedules `file_name` for indexing after `batch_window` of quiet.
    ///
    /// Re-queueing an already pending file restarts its window.
    pub fn queue(&self, file_name: &str, batch_window: Duration) {
        if let Ok(mut state) = self.pending.state.lock() {
            state
                .deadlines
                .insert(file_name.to_string(), Instant::now() + batch_window);
            self.pending.wake.notify_one();
        }
    }

    /// Stops the scheduler and workers. Pending debounce windows are
    /// abandoned; jobs already dispatched are finished.
    pub fn shutdown(mut self) {
        if let Ok(mut state) = self.pending.state.lock() {
            state.stop = true;
        }
        self.pending.wake.notify_all();
        if let Some(handle) = self.scheduler.take() {
            let _ = handle.join();
        }
        drop(self.jobs);
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

fn run_scheduler(pending: Arc<Pending>, jobs: mpsc::SyncSender<String>) {
    let mut guard = match pending.state.lock() {
        Ok(guard) => guard,
        Err(_) => return,
    };
    loop {
        if guard.stop {
            return;
        }

        let now = Instant::now();
        let expired: Vec<String> = guard
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(name, _)| name.clone())
            .collect();
        if !expired.is_empty() {
            for name in &expired {
                guard.deadlines.remove(name);
            }
            drop(guard);
            for name in expired {
                if jobs.send(name).is_err() {
                    return;
                }
            }
            guard = match pending.state.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            continue;
        }

        let next_deadline = guard.deadlines.values().min().copied();
        guard = match next_deadline {
            Some(next) => {
                let timeout = next.saturating_duration_since(now);
                match pending.wake.wait_timeout(guard, timeout) {
                    Ok((guard, _)) => guard,
                    Err(_) => return,
                }
            }
            None => match pending.wake.wait(guard) {
                Ok(guard) => guard,
                Err(_) => return,
            },
        };
    }
}

fn index_file(index: &dyn RecordIndex, file_name: &str) {
    log::info!("indexing {file_name}");
    let start = Instant::now();

    let mut reader = match WarcFileReader::open(file_name, 0) {
        Ok(reader) => reader,
        Err(err) => {
            log::warn!("cannot index {file_name}: {err}");
            return;
        }
    };

    let mut count = 0u64;
    loop {
        match reader.next() {
            Ok(Some(entry)) => {
                count += 1;
                if let Some(id) = entry.record.headers().get(WARC_RECORD_ID) {
                    if let Err(err) = index.add(id, file_name, entry.offset) {
                        log::warn!("index add failed for {file_name}@{}: {err}", entry.offset);
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                log::error!("indexing {file_name} stopped at record {count}: {err}");
                break;
            }
        }
    }
    if let Err(err) = index.flush() {
        log::warn!("index flush failed for {file_name}: {err}");
    }
    log::info!(
        "finished indexing {file_name}: {count} record(s) in {:?}",
        start.elapsed()
    );
}
