use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;
use warcstream::record::header::WARC_RECORD_ID;
use warcstream::{
    Block, IndexWorker, PatternNameGenerator, RecordBuilder, RecordIndex, RecordType,
    WarcFileWriter, WarcRecord, WriterOptions,
};

#[derive(Default)]
struct MemoryIndex {
    entries: Mutex<Vec<(String, String, u64)>>,
    flushes: AtomicU32,
}

impl RecordIndex for MemoryIndex {
    fn add(&self, record_id: &str, file_name: &str, offset: u64) -> warcstream::Result<()> {
        self.entries
            .lock()
            .expect("entries lock")
            .push((record_id.to_string(), file_name.to_string(), offset));
        Ok(())
    }

    fn flush(&self) -> warcstream::Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn record(body: &[u8]) -> WarcRecord {
    let mut builder = RecordBuilder::new(RecordType::Resource);
    builder.body(Block::Raw(body.to_vec()));
    builder.build().expect("build record")
}

#[test]
fn queued_file_is_indexed_after_the_batch_window() {
    let dir = tempdir().expect("tempdir");
    let options = WriterOptions {
        compress: false,
        name_generator: Arc::new(PatternNameGenerator::new(dir.path())),
        ..WriterOptions::default()
    };
    let pool = WarcFileWriter::new(options).expect("pool");

    let records: Vec<WarcRecord> = (0..3)
        .map(|i| record(format!("indexed record {i}").as_bytes()))
        .collect();
    let ids: Vec<String> = records
        .iter()
        .map(|r| r.headers().get(WARC_RECORD_ID).expect("id").to_string())
        .collect();
    let outcomes: Vec<_> = records
        .into_iter()
        .map(|r| pool.write(r).expect("write"))
        .collect();
    pool.shutdown().expect("shutdown");

    let path = dir.path().join(&outcomes[0].file_name);
    let path_str = path.to_string_lossy().into_owned();

    let index = Arc::new(MemoryIndex::default());
    let worker = IndexWorker::new(index.clone(), 2).expect("index worker");

    // Re-queueing within the window debounces into a single pass.
    worker.queue(&path_str, Duration::from_millis(20));
    worker.queue(&path_str, Duration::from_millis(20));
    std::thread::sleep(Duration::from_millis(500));
    worker.shutdown();

    let entries = index.entries.lock().expect("entries lock");
    assert_eq!(entries.len(), 3, "each record indexed exactly once");
    for ((id, outcome), entry) in ids.iter().zip(&outcomes).zip(entries.iter()) {
        assert_eq!(&entry.0, id);
        assert_eq!(entry.1, path_str);
        assert_eq!(entry.2, outcome.offset);
    }
    assert!(index.flushes.load(Ordering::Relaxed) >= 1);
}
