use polars::prelude::PolarsError;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FocusError {
    /// Source file is missing or cannot be opened.
    #[error("Input not found or unreadable: {}: {source}", path.display())]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed CSV in {}: {source}", path.display())]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The estimation pass retained nothing, so no scaling factor exists.
    #[error("Estimation sample is empty ({rows} rows at fraction {fraction}); cannot derive a scaling factor")]
    EmptySample { fraction: f64, rows: u64 },

    #[error("Failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Input has no data rows: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("Requested {requested} rows but only {available} are available")]
    NotEnoughRows { requested: usize, available: usize },

    #[error("Parquet conversion failed: {0}")]
    Parquet(#[from] PolarsError),

    #[error("Validation failed with {0} finding(s)")]
    ValidationFailed(usize),
}

impl FocusError {
    pub fn input(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FocusError::InputNotFound {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        FocusError::MalformedInput {
            path: path.into(),
            source,
        }
    }

    pub fn output(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        FocusError::OutputWrite {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;
