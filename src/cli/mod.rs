//! Command-line interface module

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::conversion::FailurePolicy;

/// Main CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "mcapconv")]
#[command(about = "Convert robot episode datasets to MCAP log files")]
#[command(version)]
#[command(long_about = None)]
pub struct Args {
    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Download a dataset from the Hugging Face Hub
    Download {
        /// Dataset ID (e.g., lerobot/pusht)
        dataset_id: String,

        /// Output directory (default: ./data/<dataset_id>)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Episode IDs to download (e.g., 0 1 2). If not specified, all
        /// episodes will be downloaded.
        #[arg(short, long, num_args = 1..)]
        episodes: Option<Vec<u64>>,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Convert an episode dataset to MCAP format
    Convert {
        /// Input directory containing the episode dataset
        input_dir: PathBuf,

        /// Output directory for MCAP files (default: <input_dir>/mcap)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Episode IDs to convert (e.g., 0 1 2). If not specified, episodes
        /// are discovered under the input directory.
        #[arg(short, long, num_args = 1..)]
        episodes: Option<Vec<u64>>,

        /// Path to the mapping-configuration template (default: packaged
        /// config)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the converter-functions file (default: packaged
        /// functions)
        #[arg(short = 'f', long)]
        converter_functions: Option<PathBuf>,

        /// Exit with an error if any episode fails to convert
        #[arg(long)]
        strict: bool,

        /// Number of worker threads (1 = sequential)
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

impl Commands {
    /// The failure policy selected on the command line.
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Commands::Convert { strict: true, .. } => FailurePolicy::Strict,
            _ => FailurePolicy::BestEffort,
        }
    }
}
