use std::sync::Arc;

use tempfile::tempdir;
use warcstream::{
    Block, PatternNameGenerator, RecordBuilder, RecordType, WarcFileReader, WarcFileWriter,
    WarcRecord, WriterOptions,
};

/// Deterministic, effectively incompressible filler.
fn noise(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        out.extend_from_slice(&seed.to_le_bytes());
    }
    out.truncate(len);
    out
}

fn record(body: &[u8]) -> WarcRecord {
    let mut builder = RecordBuilder::new(RecordType::Resource);
    builder.body(Block::Raw(body.to_vec()));
    builder.build().expect("build record")
}

#[test]
fn compressed_records_resume_from_their_member_offsets() {
    let dir = tempdir().expect("tempdir");
    let options = WriterOptions {
        max_file_size: 1000,
        compress: true,
        expected_compression_ratio: 0.5,
        name_generator: Arc::new(PatternNameGenerator::new(dir.path())),
        ..WriterOptions::default()
    };
    let pool = WarcFileWriter::new(options).expect("pool");

    let bodies: Vec<Vec<u8>> = (0..6).map(|i| noise(500, 0x9e37 + i)).collect();
    let mut outcomes = Vec::new();
    for body in &bodies {
        outcomes.push(pool.write(record(body)).expect("write"));
    }
    pool.shutdown().expect("shutdown");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.len() >= 2, "projected sizes must force a roll: {names:?}");
    assert!(names.iter().all(|n| n.ends_with(".warc.gz")));

    // Every record is an independent gzip member: re-read each one directly
    // from the offset reported at write time.
    for (body, outcome) in bodies.iter().zip(&outcomes) {
        let path = dir.path().join(&outcome.file_name);
        let mut reader = WarcFileReader::open(&path, outcome.offset).expect("open reader");
        let entry = reader.next().expect("read").expect("record");
        assert_eq!(entry.offset, outcome.offset);
        assert!(entry.validation.is_valid(), "{}", entry.validation);
        assert_eq!(entry.record.block(), &Block::Raw(body.clone()));
    }
}

#[test]
fn compressed_stream_reads_sequentially() {
    let dir = tempdir().expect("tempdir");
    let options = WriterOptions {
        compress: true,
        name_generator: Arc::new(PatternNameGenerator::new(dir.path())),
        ..WriterOptions::default()
    };
    let pool = WarcFileWriter::new(options).expect("pool");

    let bodies: Vec<Vec<u8>> = (0..3).map(|i| noise(200, 7 + i)).collect();
    let outcomes: Vec<_> = bodies
        .iter()
        .map(|b| pool.write(record(b)).expect("write"))
        .collect();
    pool.shutdown().expect("shutdown");

    let mut reader =
        WarcFileReader::open(dir.path().join(&outcomes[0].file_name), 0).expect("open reader");
    for body in &bodies {
        let entry = reader.next().expect("read").expect("record");
        assert_eq!(entry.record.block(), &Block::Raw(body.clone()));
    }
    assert!(reader.next().expect("eof").is_none());
}
