//! Error types for dataset acquisition and episode conversion

use std::path::PathBuf;

/// Errors raised while downloading a dataset from the hub
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("dataset '{id}' was not found on the hub")]
    DatasetNotFound { id: String },

    #[error("not authorized to access dataset '{id}' (set HF_TOKEN for gated datasets)")]
    Unauthorized { id: String },

    #[error("hub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected hub response: {message}")]
    Protocol { message: String },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AcquisitionError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Errors raised while reading, rendering or validating a mapping configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config template {origin}: {source}")]
    Read {
        origin: String,
        source: std::io::Error,
    },

    #[error("template render failed in {origin}: {message}")]
    Render { origin: String, message: String },

    #[error("invalid YAML in {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("invalid config in {origin} at {field}: {constraint}")]
    Invalid {
        origin: String,
        field: String,
        constraint: String,
    },
}

impl ConfigError {
    pub fn render(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn invalid(
        origin: impl Into<String>,
        field: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            origin: origin.into(),
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

/// Errors raised by the converter while transforming one episode
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to read source {}: {source}", .path.display())]
    Parquet {
        path: PathBuf,
        source: parquet::errors::ParquetError,
    },

    #[error("failed to write log file: {0}")]
    Mcap(#[from] mcap::McapError),

    #[error("failed to encode message payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("column '{column}' missing from source row {row}")]
    MissingColumn { column: String, row: u64 },

    #[error("column '{column}' does not hold a usable timestamp at row {row}")]
    BadTimestamp { column: String, row: u64 },

    #[error("column '{column}' is not numeric at row {row}")]
    NotNumeric { column: String, row: u64 },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConversionError {
    pub fn parquet(path: impl Into<PathBuf>, source: parquet::errors::ParquetError) -> Self {
        Self::Parquet {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// One episode's failure inside a conversion batch
#[derive(Debug, thiserror::Error)]
pub enum EpisodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no source file for {stem} under {}", .root.display())]
    SourceNotFound { stem: String, root: PathBuf },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Fatal batch-level failures with no per-episode recovery
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("output directory {} is not creatable or writable: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to start worker pool: {message}")]
    WorkerPool { message: String },
}

/// Result type for acquisition operations
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
