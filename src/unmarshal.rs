//! Record parsing.
//!
//! The unmarshaler is lenient: recoverable format problems are collected into
//! a [`Validation`] instead of failing the stream. A gzip member is detected
//! by its magic bytes and decoded transparently, leaving the input positioned
//! at the next member so per-record compression round-trips.

use std::io::{self, BufRead, BufReader};

use flate2::bufread::GzDecoder;

use crate::error::{Error, Result};
use crate::record::header::{CONTENT_LENGTH, CONTENT_TYPE, WARC_BLOCK_DIGEST};
use crate::record::{
    block_digest, parse_warc_fields, Block, Validation, WarcHeaders, WarcRecord, WarcVersion,
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Parses the next record from a buffered input.
///
/// Returns the record, the byte offset of the record start within the input
/// (bytes of record separator skipped before it), and the validation result.
/// `Ok(None)` signals a clean end of stream.
pub trait Unmarshaler: Send + Sync {
    fn unmarshal(
        &self,
        input: &mut dyn BufRead,
    ) -> Result<Option<(WarcRecord, u64, Validation)>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WarcUnmarshaler;

impl Unmarshaler for WarcUnmarshaler {
    fn unmarshal(
        &self,
        input: &mut dyn BufRead,
    ) -> Result<Option<(WarcRecord, u64, Validation)>> {
        // Skip the separator left by the previous record (and any stray
        // newlines between records).
        let mut skipped = 0u64;
        loop {
            let buf = input.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let n = buf
                .iter()
                .take_while(|b| **b == b'\r' || **b == b'\n')
                .count();
            if n == 0 {
                break;
            }
            input.consume(n);
            skipped += n as u64;
        }

        let head = input.fill_buf()?;
        let is_gzip = head.len() >= 2 && head[..2] == GZIP_MAGIC;

        let (record, validation) = if is_gzip {
            let gz = GzDecoder::new(&mut *input);
            let mut member = BufReader::new(gz);
            let parsed = read_record(&mut member)?;
            // Drain the member so the input is positioned at the next one.
            io::copy(&mut member, &mut io::sink())?;
            parsed
        } else {
            read_record(input)?
        };

        Ok(Some((record, skipped, validation)))
    }
}

fn read_line<R: BufRead + ?Sized>(input: &mut R, buf: &mut Vec<u8>) -> Result<usize> {
    buf.clear();
    let n = input.read_until(b'\n', buf)?;
    while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(n)
}

fn read_record<R: BufRead + ?Sized>(input: &mut R) -> Result<(WarcRecord, Validation)> {
    let mut validation = Validation::new();
    let mut line = Vec::new();

    if read_line(input, &mut line)? == 0 {
        return Err(Error::Parse("missing record version line".to_string()));
    }
    let version_line = String::from_utf8_lossy(&line).into_owned();
    if !version_line.starts_with("WARC/") {
        return Err(Error::Parse(format!(
            "expected WARC version line, got {version_line:?}"
        )));
    }
    let version = match WarcVersion::parse(&version_line) {
        Some(v) => v,
        None => {
            validation.push(format!("unsupported version {version_line:?}"));
            WarcVersion::V1_1
        }
    };

    let mut headers = WarcHeaders::new();
    loop {
        if read_line(input, &mut line)? == 0 {
            return Err(Error::Parse("unexpected end of stream in record header".to_string()));
        }
        if line.is_empty() {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        match text.split_once(':') {
            Some((name, value)) => headers.set(name.trim(), value.trim()),
            None => validation.push(format!("malformed header line {text:?}")),
        }
    }

    let content_length: u64 = match headers.get(CONTENT_LENGTH) {
        Some(s) => s
            .parse()
            .map_err(|_| Error::BadHeader(format!("invalid Content-Length: {s}")))?,
        None => {
            validation.push("missing Content-Length".to_string());
            0
        }
    };

    let mut body = vec![0u8; usize::try_from(content_length).map_err(|_| {
        Error::BadHeader(format!("Content-Length out of range: {content_length}"))
    })?];
    input
        .read_exact(&mut body)
        .map_err(|_| Error::Parse("unexpected end of stream in record block".to_string()))?;

    if let Some(digest) = headers.get(WARC_BLOCK_DIGEST) {
        if digest.starts_with("sha256:") && digest != block_digest(&body) {
            validation.push("block digest mismatch".to_string());
        }
    }

    let block = match headers.get(CONTENT_TYPE) {
        Some(ct) if ct.starts_with("application/warc-fields") => match parse_warc_fields(&body) {
            Some(fields) => Block::WarcFields(fields),
            None => {
                validation.push("malformed warc-fields block".to_string());
                Block::Raw(body)
            }
        },
        Some(ct) if ct.starts_with("application/http") => Block::Http(body),
        _ => Block::Raw(body),
    };

    Ok((WarcRecord::new(version, headers, block), validation))
}
