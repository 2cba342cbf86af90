use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Failures raised by the extraction and sequencing pipelines.
///
/// Every variant that can be tied to an input carries enough context (path,
/// board, algorithm, iteration) to locate the offending data.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing input: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("No calibration row for board {board}: {reason}")]
    Lookup { board: u32, reason: String },

    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[cfg_attr(not(feature = "storage_hdf5"), allow(dead_code))]
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Feature '{0}' is not enabled in this build")]
    FeatureNotEnabled(String),
}

impl BuildError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        BuildError::Csv {
            path: path.into(),
            source,
        }
    }
}
