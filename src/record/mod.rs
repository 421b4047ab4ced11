//! The WARC record model: header bag, typed block, and builder.

mod block;
mod builder;
pub mod header;
mod types;
mod validation;

pub use block::Block;
pub(crate) use block::parse_warc_fields;
pub use builder::RecordBuilder;
pub(crate) use builder::{block_digest, new_record_id};
pub use header::WarcHeaders;
pub use types::{RecordType, WarcVersion};
pub use validation::Validation;

use header::WARC_TYPE;

/// One WARC record: a version, an ordered header bag, and a typed block.
///
/// Records are fully owned values; dropping one releases its body.
#[derive(Debug, Clone, PartialEq)]
pub struct WarcRecord {
    version: WarcVersion,
    headers: WarcHeaders,
    block: Block,
}

impl WarcRecord {
    pub(crate) fn new(version: WarcVersion, headers: WarcHeaders, block: Block) -> Self {
        Self {
            version,
            headers,
            block,
        }
    }

    pub fn version(&self) -> WarcVersion {
        self.version
    }

    pub fn headers(&self) -> &WarcHeaders {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut WarcHeaders {
        &mut self.headers
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    /// The record type parsed from the `WARC-Type` header.
    pub fn record_type(&self) -> Option<RecordType> {
        self.headers.get(WARC_TYPE).and_then(RecordType::parse)
    }
}
