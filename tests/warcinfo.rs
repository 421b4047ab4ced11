use std::sync::Arc;

use tempfile::tempdir;
use warcstream::record::header::{WARC_FILENAME, WARC_RECORD_ID, WARC_WARCINFO_ID};
use warcstream::{
    Block, PatternNameGenerator, RecordBuilder, RecordType, WarcFileReader, WarcFileWriter,
    WarcInfoFunc, WarcRecord, WriterOptions,
};

fn record(body: &[u8]) -> WarcRecord {
    let mut builder = RecordBuilder::new(RecordType::Resource);
    builder.body(Block::Raw(body.to_vec()));
    builder.build().expect("build record")
}

#[test]
fn files_start_with_warcinfo_and_records_link_to_it() {
    let dir = tempdir().expect("tempdir");
    let info_func: WarcInfoFunc = Arc::new(|builder| {
        builder.field("operator", "test");
        Ok(())
    });
    let options = WriterOptions {
        max_file_size: 800,
        compress: false,
        warc_info_func: Some(info_func),
        name_generator: Arc::new(PatternNameGenerator::new(dir.path())),
        ..WriterOptions::default()
    };
    let pool = WarcFileWriter::new(options).expect("pool");

    pool.write(record(&[b'x'; 300])).expect("write first");
    pool.write(record(&[b'y'; 300])).expect("write second");
    pool.shutdown().expect("shutdown");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert!(!names.is_empty());

    let mut data_records = 0;
    for name in &names {
        let mut reader = WarcFileReader::open(dir.path().join(name), 0).expect("open reader");
        let head = reader.next().expect("read").expect("warcinfo record");

        assert_eq!(head.record.record_type(), Some(RecordType::Warcinfo));
        assert_eq!(head.record.headers().get(WARC_FILENAME), Some(name.as_str()));
        // The info record is not stamped with its own id.
        assert_eq!(head.record.headers().get(WARC_WARCINFO_ID), None);
        match head.record.block() {
            Block::WarcFields(fields) => {
                assert!(fields.contains(&("operator".to_string(), "test".to_string())));
            }
            other => panic!("expected warc-fields block, got {other:?}"),
        }
        let info_id = head
            .record
            .headers()
            .get(WARC_RECORD_ID)
            .expect("info id")
            .to_string();

        while let Some(entry) = reader.next().expect("read") {
            data_records += 1;
            assert_eq!(
                entry.record.headers().get(WARC_WARCINFO_ID),
                Some(info_id.as_str())
            );
        }
    }
    assert_eq!(data_records, 2);
}
