use std::fmt;

/// WARC format version written on a record's first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarcVersion {
    V1_0,
    #[default]
    V1_1,
}

impl WarcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarcVersion::V1_0 => "WARC/1.0",
            WarcVersion::V1_1 => "WARC/1.1",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WARC/1.0" => Some(WarcVersion::V1_0),
            "WARC/1.1" => Some(WarcVersion::V1_1),
            _ => None,
        }
    }
}

impl fmt::Display for WarcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The eight record types of ISO 28500, carried in the `WARC-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Warcinfo,
    Response,
    Request,
    Metadata,
    Resource,
    Revisit,
    Conversion,
    Continuation,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Warcinfo => "warcinfo",
            RecordType::Response => "response",
            RecordType::Request => "request",
            RecordType::Metadata => "metadata",
            RecordType::Resource => "resource",
            RecordType::Revisit => "revisit",
            RecordType::Conversion => "conversion",
            RecordType::Continuation => "continuation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "warcinfo" => Some(RecordType::Warcinfo),
            "response" => Some(RecordType::Response),
            "request" => Some(RecordType::Request),
            "metadata" => Some(RecordType::Metadata),
            "resource" => Some(RecordType::Resource),
            "revisit" => Some(RecordType::Revisit),
            "conversion" => Some(RecordType::Conversion),
            "continuation" => Some(RecordType::Continuation),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_round_trips() {
        for rt in [
            RecordType::Warcinfo,
            RecordType::Response,
            RecordType::Request,
            RecordType::Metadata,
            RecordType::Resource,
            RecordType::Revisit,
            RecordType::Conversion,
            RecordType::Continuation,
        ] {
            assert_eq!(RecordType::parse(rt.as_str()), Some(rt));
        }
        assert_eq!(RecordType::parse("bogus"), None);
    }

    #[test]
    fn version_round_trips() {
        assert_eq!(WarcVersion::parse("WARC/1.0"), Some(WarcVersion::V1_0));
        assert_eq!(WarcVersion::parse("WARC/1.1"), Some(WarcVersion::V1_1));
        assert_eq!(WarcVersion::parse("WARC/0.18"), None);
    }
}
