use std::borrow::Cow;

/// A record's body, tagged by how the payload is structured.
///
/// The HTTP variant carries the `application/http` payload unparsed; decoding
/// the inner HTTP message is a concern of higher layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Opaque payload bytes.
    Raw(Vec<u8>),
    /// An unparsed `application/http` message.
    Http(Vec<u8>),
    /// An `application/warc-fields` name/value listing.
    WarcFields(Vec<(String, String)>),
}

impl Block {
    /// The serialized form of the block as written to disk.
    pub fn bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Block::Raw(bytes) | Block::Http(bytes) => Cow::Borrowed(bytes),
            Block::WarcFields(fields) => {
                let mut out = Vec::new();
                for (name, value) in fields {
                    out.extend_from_slice(name.as_bytes());
                    out.extend_from_slice(b": ");
                    out.extend_from_slice(value.as_bytes());
                    out.extend_from_slice(b"\r\n");
                }
                Cow::Owned(out)
            }
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::Raw(Vec::new())
    }
}

/// Parses an `application/warc-fields` payload into name/value pairs.
///
/// Returns `None` when a line is not a `name: value` field.
pub(crate) fn parse_warc_fields(bytes: &[u8]) -> Option<Vec<(String, String)>> {
    let text = std::str::from_utf8(bytes).ok()?;
    let mut fields = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':')?;
        fields.push((name.trim().to_string(), value.trim().to_string()));
    }
    Some(fields)
}
