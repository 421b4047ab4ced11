use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A header value the engine depends on could not be parsed.
    BadHeader(String),
    Marshal(&'static str),
    Parse(String),
    /// Internal writer state violated an invariant (poisoned lock, missing file handle).
    State(&'static str),
    /// Write attempted after the writer pool released its workers.
    Shutdown,
    /// Aggregated per-writer failures from closing a pool.
    Close(Vec<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::BadHeader(msg) => write!(f, "bad header: {msg}"),
            Error::Marshal(msg) => write!(f, "marshal error: {msg}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::State(msg) => write!(f, "invalid writer state: {msg}"),
            Error::Shutdown => write!(f, "writer pool is shut down"),
            Error::Close(errs) => {
                write!(f, "close failed for {} writer(s): ", errs.len())?;
                for (i, err) in errs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
