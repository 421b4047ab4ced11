//! Output file naming.

use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::timestamp;

/// Produces the next output file name.
///
/// Returns the target directory and the file basename. Name generation never
/// fails; the name is advisory until the file is actually created.
pub trait FileNameGenerator: Send + Sync {
    fn next_name(&self) -> (PathBuf, String);
}

pub const DEFAULT_PATTERN: &str = "{prefix}{ts}-{serial:04}-{ip}.warc";

/// Expands a name pattern with a per-generator serial counter.
///
/// Supported substitutions: `{prefix}`, `{ts}` (14-digit UTC timestamp),
/// `{serial}` / `{serial:0N}` (atomically incremented, optionally
/// zero-padded) and `{ip}` (outbound interface address, `127.0.0.1` when
/// probing fails). Unknown tokens pass through verbatim.
pub struct PatternNameGenerator {
    pub directory: PathBuf,
    pub prefix: String,
    pub pattern: String,
    serial: AtomicU32,
    clock: Arc<dyn Clock>,
    host: String,
}

impl PatternNameGenerator {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_clock(directory, Arc::new(SystemClock))
    }

    pub fn with_clock(directory: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory: directory.into(),
            prefix: String::new(),
            pattern: DEFAULT_PATTERN.to_string(),
            serial: AtomicU32::new(0),
            clock,
            host: outbound_ip(),
        }
    }
}

impl Default for PatternNameGenerator {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FileNameGenerator for PatternNameGenerator {
    fn next_name(&self) -> (PathBuf, String) {
        let serial = self.serial.fetch_add(1, Ordering::Relaxed) + 1;
        let ts = timestamp::utc14(self.clock.now());
        let name = expand(&self.pattern, &self.prefix, &ts, serial, &self.host);
        (self.directory.clone(), name)
    }
}

fn expand(pattern: &str, prefix: &str, ts: &str, serial: u32, ip: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 32);
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let token = &after[..close];
        match token {
            "prefix" => out.push_str(prefix),
            "ts" => out.push_str(ts),
            "ip" => out.push_str(ip),
            "serial" => out.push_str(&serial.to_string()),
            _ => match token.strip_prefix("serial:0").and_then(|w| w.parse::<usize>().ok()) {
                Some(width) => out.push_str(&format!("{serial:0width$}")),
                None => {
                    out.push('{');
                    out.push_str(token);
                    out.push('}');
                }
            },
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Address of the default outbound interface.
///
/// Connecting a UDP socket never sends a packet; it only resolves routing.
fn outbound_ip() -> String {
    UdpSocket::bind(("0.0.0.0", 0))
        .and_then(|socket| {
            socket.connect(("8.8.8.8", 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}
