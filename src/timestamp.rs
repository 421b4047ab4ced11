//! WARC timestamp rendering.
//!
//! Two formats appear in the wild: the 14-digit compact form used in file
//! names (`YYYYMMDDhhmmss`) and the W3C ISO-8601 form used in `WARC-Date`
//! headers. Both are always UTC.

use time::OffsetDateTime;

fn datetime(unix_ns: u64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(unix_ns as i128)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Compact 14-digit UTC timestamp: `YYYYMMDDhhmmss`.
pub fn utc14(unix_ns: u64) -> String {
    let dt = datetime(unix_ns);
    let date = dt.date();
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        date.year(),
        date.month() as u8,
        date.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

/// W3C ISO-8601 UTC timestamp with second precision: `YYYY-MM-DDThh:mm:ssZ`.
pub fn w3c_iso8601(unix_ns: u64) -> String {
    let dt = datetime(unix_ns);
    let date = dt.date();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        date.year(),
        date.month() as u8,
        date.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}
