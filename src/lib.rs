//! Robot-episode dataset to MCAP converter
//!
//! A Rust CLI tool for converting directory-structured robot episode
//! datasets (one tabular file per episode) into self-contained MCAP log
//! files, one per episode, driven by a templated YAML mapping
//! configuration.

// Allow dead code for library exports that may not be used by the binary yet
#![allow(dead_code)]

pub mod cli;
pub mod config;
pub mod conversion;
pub mod dataset;
pub mod error;
pub mod hub;

// Re-export commonly used types
pub use config::{ConfigTemplate, ConversionConfig, ConverterFunctions};
pub use conversion::{convert_all, BatchOptions, BatchOutcome, FailurePolicy, McapConverter};
pub use dataset::EpisodeId;
pub use error::{AcquisitionError, ConfigError, ConversionError, EpisodeError};

/// Convert one episode source file with an already rendered configuration
pub fn convert_episode(
    config: ConversionConfig,
    functions: &ConverterFunctions,
    source: &std::path::Path,
    dest: &std::path::Path,
) -> Result<conversion::ConversionMetadata, EpisodeError> {
    let converter = McapConverter::new(config, functions)
        .map_err(|violation| EpisodeError::Config(violation.into_config_error("<config>")))?;
    Ok(converter.convert(source, dest)?)
}
