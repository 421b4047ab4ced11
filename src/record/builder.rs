use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::record::header::{
    CONTENT_LENGTH, WARC_BLOCK_DIGEST, WARC_DATE, WARC_RECORD_ID, WARC_TYPE,
};
use crate::record::{Block, RecordType, WarcHeaders, WarcRecord, WarcVersion};
use crate::timestamp;

/// Computes the `sha256:<hex>` digest label for a block.
pub(crate) fn block_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

pub(crate) fn new_record_id() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

/// Assembles a record and computes its derived header fields.
///
/// `build` fills in `WARC-Record-ID`, `WARC-Date` and `WARC-Type` when the
/// caller did not supply them, then computes `Content-Length` and
/// `WARC-Block-Digest` from the block.
pub struct RecordBuilder {
    version: WarcVersion,
    record_type: RecordType,
    headers: WarcHeaders,
    block: Block,
    fields: Vec<(String, String)>,
    clock: Arc<dyn Clock>,
}

impl RecordBuilder {
    pub fn new(record_type: RecordType) -> Self {
        Self::with_clock(record_type, Arc::new(SystemClock))
    }

    pub fn with_clock(record_type: RecordType, clock: Arc<dyn Clock>) -> Self {
        Self {
            version: WarcVersion::default(),
            record_type,
            headers: WarcHeaders::new(),
            block: Block::default(),
            fields: Vec::new(),
            clock,
        }
    }

    pub fn version(&mut self, version: WarcVersion) -> &mut Self {
        self.version = version;
        self
    }

    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    /// Sets the record body.
    pub fn body(&mut self, block: Block) -> &mut Self {
        self.block = block;
        self
    }

    /// Appends one name/value pair to an `application/warc-fields` body.
    ///
    /// Mutually exclusive with `body`; the accumulated fields win.
    pub fn field(&mut self, name: &str, value: &str) -> &mut Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(mut self) -> Result<WarcRecord> {
        if !self.fields.is_empty() {
            self.block = Block::WarcFields(std::mem::take(&mut self.fields));
        }

        // Identity headers go at the front, in a fixed order.
        if !self.headers.contains(WARC_TYPE) {
            self.headers.insert_front(WARC_TYPE, self.record_type.as_str());
        }
        if !self.headers.contains(WARC_DATE) {
            let date = timestamp::w3c_iso8601(self.clock.now());
            self.headers.insert_front(WARC_DATE, &date);
        }
        if !self.headers.contains(WARC_RECORD_ID) {
            self.headers.insert_front(WARC_RECORD_ID, &new_record_id());
        }

        let bytes = self.block.bytes();
        self.headers.set(CONTENT_LENGTH, &bytes.len().to_string());
        self.headers.set(WARC_BLOCK_DIGEST, &block_digest(&bytes));
        drop(bytes);

        Ok(WarcRecord::new(self.version, self.headers, self.block))
    }
}
