use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};

/// A pass-through reader that counts the bytes delivered from its source.
///
/// An optional ceiling truncates reads so that at most `limit` bytes are ever
/// produced; once the ceiling is reached, reads report end-of-stream even when
/// the source has more data. The counter may be observed concurrently; `read`
/// itself takes `&mut self` and is not shared.
pub struct CountingReader<R> {
    inner: R,
    count: AtomicU64,
    limit: Option<u64>,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            count: AtomicU64::new(0),
            limit: None,
        }
    }

    /// Like [`CountingReader::new`], but reads at most `limit` bytes.
    pub fn with_limit(inner: R, limit: u64) -> Self {
        Self {
            inner,
            count: AtomicU64::new(0),
            limit: Some(limit),
        }
    }

    /// Number of bytes delivered so far.
    pub fn bytes_read(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let buf = match self.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.bytes_read());
                if remaining == 0 {
                    return Ok(0);
                }
                let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
                &mut buf[..want]
            }
            None => buf,
        };
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn counts_bytes_delivered() {
        let mut reader = CountingReader::new(Cursor::new(vec![0u8; 100]));
        let mut buf = [0u8; 30];
        reader.read(&mut buf).unwrap();
        assert_eq!(reader.bytes_read(), 30);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(reader.bytes_read(), 100);
        assert_eq!(rest.len(), 70);
    }

    #[test]
    fn limit_truncates_and_reports_eof() {
        let mut reader = CountingReader::with_limit(Cursor::new(vec![7u8; 100]), 10);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(reader.bytes_read(), 10);

        // At the ceiling further reads are end-of-stream.
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn zero_limit_reads_nothing() {
        let mut reader = CountingReader::with_limit(Cursor::new(vec![1u8; 8]), 0);
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.bytes_read(), 0);
    }
}
