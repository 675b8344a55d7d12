//! Batch conversion driver: one log file per episode

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::config::{ConfigTemplate, ConverterFunctions};
use crate::conversion::engine::{ConversionMetadata, McapConverter};
use crate::dataset::{self, EpisodeId};
use crate::error::{BatchError, EpisodeError};

/// Output log file extension
pub const OUTPUT_EXTENSION: &str = "mcap";

/// How a finished batch maps onto an exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report per-episode failures but treat the batch as successful as
    /// long as the loop completed
    #[default]
    BestEffort,
    /// Any failed episode fails the batch
    Strict,
}

/// Knobs for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads; 1 processes episodes strictly sequentially
    pub jobs: usize,
    /// Suppress the progress bar and per-episode success lines
    pub quiet: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            quiet: false,
        }
    }
}

/// One episode's recorded failure
#[derive(Debug)]
pub struct EpisodeFailure {
    pub episode: EpisodeId,
    pub error: EpisodeError,
}

/// What a completed batch did
#[derive(Debug)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: Vec<EpisodeFailure>,
    pub messages_written: u64,
    pub finished_at: DateTime<Utc>,
}

impl BatchOutcome {
    /// Whether the batch counts as successful under `policy`.
    pub fn is_success(&self, policy: FailurePolicy) -> bool {
        match policy {
            FailurePolicy::BestEffort => true,
            FailurePolicy::Strict => self.failed.is_empty(),
        }
    }
}

/// Convert every episode in `episodes`, writing one `<stem>.mcap` per
/// episode into `output_dir`.
///
/// The mapping configuration is re-rendered for every episode. A failing
/// episode is recorded and the loop continues; only the output directory
/// being uncreatable or unwritable, or the worker pool failing to start,
/// is fatal.
pub fn convert_all(
    episodes: &[EpisodeId],
    input_root: &Path,
    output_dir: &Path,
    template: &ConfigTemplate,
    functions: &ConverterFunctions,
    options: &BatchOptions,
) -> Result<BatchOutcome, BatchError> {
    std::fs::create_dir_all(output_dir).map_err(|source| BatchError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;
    // create_dir_all succeeds on a pre-existing read-only directory; an
    // unwritable output directory must fail the whole run before any
    // episode is attempted
    probe_writable(output_dir)?;

    // An unreadable input root surfaces as SourceNotFound per episode
    let sources = dataset::source_index(input_root).unwrap_or_default();

    let progress = if options.quiet || episodes.is_empty() {
        ProgressBar::hidden()
    } else {
        episode_progress(episodes.len() as u64)
    };

    let run = |episode: &EpisodeId| {
        let result = convert_one(*episode, &sources, input_root, output_dir, template, functions);
        match &result {
            Ok(metadata) => {
                if !options.quiet {
                    progress.println(format!(
                        "✓ {episode} ({} rows, {})",
                        metadata.rows,
                        human_size(metadata.output_bytes)
                    ));
                }
            }
            Err(error) => {
                progress.suspend(|| eprintln!("✗ {episode}: {error}"));
            }
        }
        progress.inc(1);
        (*episode, result)
    };

    let results: Vec<(EpisodeId, Result<ConversionMetadata, EpisodeError>)> = if options.jobs <= 1
    {
        episodes.iter().map(run).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(|e| BatchError::WorkerPool {
                message: e.to_string(),
            })?;
        pool.install(|| episodes.par_iter().map(run).collect())
    };

    progress.finish_and_clear();

    let mut succeeded = 0;
    let mut messages_written = 0;
    let mut failed = Vec::new();
    for (episode, result) in results {
        match result {
            Ok(metadata) => {
                succeeded += 1;
                messages_written += metadata.messages;
            }
            Err(error) => failed.push(EpisodeFailure { episode, error }),
        }
    }
    Ok(BatchOutcome {
        succeeded,
        failed,
        messages_written,
        finished_at: Utc::now(),
    })
}

/// Fail fast when `output_dir` exists but cannot be written to.
fn probe_writable(output_dir: &Path) -> Result<(), BatchError> {
    let probe = output_dir.join(format!(".write-test-{}", std::process::id()));
    std::fs::write(&probe, b"")
        .and_then(|_| std::fs::remove_file(&probe))
        .map_err(|source| BatchError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })
}

/// Progress bar advancing once per finished episode.
fn episode_progress(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} converting [{wide_bar:.cyan/blue}] {pos}/{len} episodes ({eta})",
        )
        .expect("episode progress template is valid")
        .progress_chars("=> "),
    );
    bar
}

/// Render a byte count like `3.4 MB` for the per-episode report lines.
pub(crate) fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let size = bytes as f64;
    if size >= GB {
        format!("{:.1} GB", size / GB)
    } else if size >= MB {
        format!("{:.1} MB", size / MB)
    } else if size >= KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{bytes} B")
    }
}

fn convert_one(
    episode: EpisodeId,
    sources: &BTreeMap<EpisodeId, PathBuf>,
    input_root: &Path,
    output_dir: &Path,
    template: &ConfigTemplate,
    functions: &ConverterFunctions,
) -> Result<ConversionMetadata, EpisodeError> {
    let config = template.render(episode)?;
    let converter = McapConverter::new(config, functions)
        .map_err(|violation| EpisodeError::Config(violation.into_config_error(template.origin())))?;

    let source = sources
        .get(&episode)
        .ok_or_else(|| EpisodeError::SourceNotFound {
            stem: episode.stem(),
            root: input_root.to_path_buf(),
        })?;

    let dest = output_dir.join(format!("{}.{}", episode.stem(), OUTPUT_EXTENSION));
    Ok(converter.convert(source, &dest)?)
}
