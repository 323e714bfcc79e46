use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Setup-level failures. Per-measurement problems never surface here; they
/// become missing cells in the result tables instead.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid size range: min={min} max={max} step={step}")]
    InvalidRange { min: u64, max: u64, step: u64 },

    #[error("empty command line")]
    EmptyCommand,

    #[error("{}:{line}: {reason}", path.display())]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("writing table {}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("plotting {}: {reason}", path.display())]
    Plot { path: PathBuf, reason: String },
}

impl BenchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
