//! Library-level error type.
//!
//! Binaries under `src/bin/` bubble these up through `anyhow::Error` instead
//! of matching on variants; within the library we keep them typed so the
//! coordinator and worker can distinguish recoverable I/O failures from the
//! fatal startup failures that are the binaries' problem.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed record in {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    #[error("user callback failed: {0}")]
    Callback(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("rpc transport error: {0}")]
    Rpc(#[from] anyhow::Error),
}

impl Error {
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
