use std::io;

use thiserror::Error;

/// Failure modes of the merge scanner, distinct from the storage layer's
/// plain `io::Error` because callers care whether a scan can be retried,
/// re-seeked, or must be abandoned outright.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt store data: {0}")]
    Corrupt(String),

    #[error("scan interrupted: {0}")]
    Interrupted(String),

    #[error("invalid scan: {0}")]
    InvalidScan(String),

    #[error("row too big: row {row:?} exceeded {limit} bytes")]
    RowTooBig { row: Vec<u8>, limit: u64 },

    #[error("scanner invariant violated: {0}")]
    Assertion(String),
}

impl From<ScanError> for io::Error {
    fn from(e: ScanError) -> io::Error {
        match e {
            ScanError::Io(inner) => inner,
            ScanError::InvalidScan(_) | ScanError::RowTooBig { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
            }
            ScanError::Corrupt(_) | ScanError::Interrupted(_) | ScanError::Assertion(_) => {
                io::Error::new(io::ErrorKind::Other, e.to_string())
            }
        }
    }
}
