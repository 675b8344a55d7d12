//! Episode conversion module
//!
//! The batch driver that walks an episode set and the row-to-message
//! engine that turns one tabular source file into one MCAP log file.

pub mod batch;
pub mod engine;

pub use batch::{
    convert_all, BatchOptions, BatchOutcome, EpisodeFailure, FailurePolicy, OUTPUT_EXTENSION,
};
pub use engine::{ConversionMetadata, McapConverter};
