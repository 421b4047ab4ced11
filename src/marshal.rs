//! Record serialization.
//!
//! One record serializes as a version line, header lines, an empty line, the
//! block, and a CRLF CRLF trailer. With a non-zero record budget the marshaler
//! splits oversized records: the written segment is truncated to fit and the
//! remainder comes back as a `continuation` record for the caller to write
//! next. The last segment of a chain carries `WARC-Segment-Total-Length`.

use std::io::Write;

use crate::error::{Error, Result};
use crate::record::header::{
    CONTENT_LENGTH, WARC_BLOCK_DIGEST, WARC_DATE, WARC_RECORD_ID, WARC_SEGMENT_NUMBER,
    WARC_SEGMENT_ORIGIN_ID, WARC_SEGMENT_TOTAL_LENGTH, WARC_TARGET_URI, WARC_TYPE,
};
use crate::record::{block_digest, new_record_id, Block, RecordType, WarcHeaders, WarcRecord};

const TRAILER: &[u8] = b"\r\n\r\n";
const TRAILER_LEN: u64 = TRAILER.len() as u64;

/// Serializes one record to a writer.
///
/// `max_record_size` bounds the uncompressed serialized size; `0` means
/// unbounded. A returned continuation record holds the block bytes that did
/// not fit and must be written as the next record.
pub trait Marshaler: Send + Sync {
    fn marshal(
        &self,
        out: &mut dyn Write,
        record: &mut WarcRecord,
        max_record_size: u64,
    ) -> Result<(Option<WarcRecord>, u64)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WarcMarshaler;

fn serialize_header(record: &WarcRecord) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(record.version().as_str().as_bytes());
    out.extend_from_slice(b"\r\n");
    for (name, value) in record.headers().iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}

impl Marshaler for WarcMarshaler {
    fn marshal(
        &self,
        out: &mut dyn Write,
        record: &mut WarcRecord,
        max_record_size: u64,
    ) -> Result<(Option<WarcRecord>, u64)> {
        let block_len = record.block().len();
        let header = serialize_header(record);
        let total = header.len() as u64 + block_len + TRAILER_LEN;

        if max_record_size == 0 || total <= max_record_size {
            out.write_all(&header)?;
            out.write_all(&record.block().bytes())?;
            out.write_all(TRAILER)?;
            return Ok((None, total));
        }

        self.marshal_segmented(out, record, max_record_size)
    }
}

impl WarcMarshaler {
    fn marshal_segmented(
        &self,
        out: &mut dyn Write,
        record: &mut WarcRecord,
        max_record_size: u64,
    ) -> Result<(Option<WarcRecord>, u64)> {
        let block = record.block().bytes().into_owned();
        let block_len = block.len() as u64;

        let seg_number: u64 = match record.headers().get(WARC_SEGMENT_NUMBER) {
            Some(s) => s
                .parse()
                .map_err(|_| Error::BadHeader(format!("invalid WARC-Segment-Number: {s}")))?,
            None => {
                record.headers_mut().set(WARC_SEGMENT_NUMBER, "1");
                1
            }
        };
        let origin_id = if seg_number == 1 {
            record.headers().get(WARC_RECORD_ID).unwrap_or("").to_string()
        } else {
            record
                .headers()
                .get(WARC_SEGMENT_ORIGIN_ID)
                .unwrap_or("")
                .to_string()
        };
        // The total-length field belongs on the last segment only; carry it
        // forward until no further split happens.
        let chain_total: u64 = match record.headers_mut().remove(WARC_SEGMENT_TOTAL_LENGTH) {
            Some(v) => v
                .parse()
                .map_err(|_| Error::BadHeader(format!("invalid WARC-Segment-Total-Length: {v}")))?,
            None => block_len,
        };

        // Trim the block so the serialized segment fits the budget. Changing
        // Content-Length changes the header length, so converge iteratively.
        let mut piece = max_record_size
            .saturating_sub(serialize_header(record).len() as u64 + TRAILER_LEN)
            .min(block_len.saturating_sub(1));
        if piece == 0 {
            return Err(Error::Marshal("record budget too small for segmentation"));
        }
        let header = loop {
            record.headers_mut().set(CONTENT_LENGTH, &piece.to_string());
            if record.headers().contains(WARC_BLOCK_DIGEST) {
                let digest = block_digest(&block[..piece as usize]);
                record.headers_mut().set(WARC_BLOCK_DIGEST, &digest);
            }
            let header = serialize_header(record);
            let need = header.len() as u64 + piece + TRAILER_LEN;
            if need <= max_record_size {
                break header;
            }
            let over = need - max_record_size;
            if piece <= over {
                return Err(Error::Marshal("record budget too small for segmentation"));
            }
            piece -= over;
        };

        out.write_all(&header)?;
        out.write_all(&block[..piece as usize])?;
        out.write_all(TRAILER)?;
        let written = header.len() as u64 + piece + TRAILER_LEN;

        let remainder = block[piece as usize..].to_vec();
        let mut headers = WarcHeaders::new();
        headers.set(WARC_RECORD_ID, &new_record_id());
        if let Some(date) = record.headers().get(WARC_DATE) {
            headers.set(WARC_DATE, date);
        }
        headers.set(WARC_TYPE, RecordType::Continuation.as_str());
        if let Some(uri) = record.headers().get(WARC_TARGET_URI) {
            headers.set(WARC_TARGET_URI, uri);
        }
        headers.set(WARC_SEGMENT_ORIGIN_ID, &origin_id);
        headers.set(WARC_SEGMENT_NUMBER, &(seg_number + 1).to_string());
        headers.set(WARC_SEGMENT_TOTAL_LENGTH, &chain_total.to_string());
        headers.set(CONTENT_LENGTH, &remainder.len().to_string());
        headers.set(WARC_BLOCK_DIGEST, &block_digest(&remainder));
        let continuation = WarcRecord::new(record.version(), headers, Block::Raw(remainder));

        Ok((Some(continuation), written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordBuilder;

    fn sample_record(body: &[u8]) -> WarcRecord {
        let mut builder = RecordBuilder::new(RecordType::Resource);
        builder.body(Block::Raw(body.to_vec()));
        builder.build().unwrap()
    }

    #[test]
    fn marshal_writes_framing() {
        let mut record = sample_record(b"hello");
        let mut out = Vec::new();
        let (next, written) = WarcMarshaler.marshal(&mut out, &mut record, 0).unwrap();
        assert!(next.is_none());
        assert_eq!(written, out.len() as u64);
        assert!(out.starts_with(b"WARC/1.1\r\n"));
        assert!(out.ends_with(b"\r\n\r\nhello\r\n\r\n"));
    }

    #[test]
    fn oversized_record_yields_continuation() {
        let mut record = sample_record(&[b'x'; 600]);
        let origin_id = record.headers().get(WARC_RECORD_ID).unwrap().to_string();

        let mut out = Vec::new();
        let budget = 400;
        let (next, written) = WarcMarshaler.marshal(&mut out, &mut record, budget).unwrap();
        assert!(written <= budget);
        assert_eq!(written, out.len() as u64);
        assert_eq!(record.headers().get(WARC_SEGMENT_NUMBER), Some("1"));

        let next = next.expect("continuation");
        assert_eq!(next.record_type(), Some(RecordType::Continuation));
        assert_eq!(next.headers().get(WARC_SEGMENT_NUMBER), Some("2"));
        assert_eq!(next.headers().get(WARC_SEGMENT_ORIGIN_ID), Some(origin_id.as_str()));
        assert_eq!(next.headers().get(WARC_SEGMENT_TOTAL_LENGTH), Some("600"));

        // The pieces partition the original block.
        let piece: u64 = record.headers().get(CONTENT_LENGTH).unwrap().parse().unwrap();
        assert_eq!(piece + next.block().len(), 600);
    }

    #[test]
    fn impossible_budget_is_an_error() {
        let mut record = sample_record(&[b'x'; 600]);
        let mut out = Vec::new();
        let err = WarcMarshaler.marshal(&mut out, &mut record, 10).unwrap_err();
        assert!(matches!(err, Error::Marshal(_)));
    }
}
