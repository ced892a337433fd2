use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors surfaced by [`crate::data::cache::DatasetCache::get`].
///
/// Both variants are fatal to the calling request; the cache never returns
/// a partially loaded snapshot.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset unavailable at {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse dataset {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Reasons a dataset file could not be turned into a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error while decoding: {0}")]
    Io(#[from] io::Error),

    #[error("Schema error: {0}")]
    Schema(String),
}

/// Bad configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown dataset engine: {0:?} (expected `arrow` or `simple`)")]
    UnknownEngine(String),
}

/// Returned when a second process-wide dataset cache is installed.
#[derive(Debug, thiserror::Error)]
#[error("The process-wide dataset cache is already installed")]
pub struct AlreadyInstalled;
