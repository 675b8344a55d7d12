//! Episode identity and source discovery

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extension carried by episode source files
pub const SOURCE_EXTENSION: &str = "parquet";

const STEM_PREFIX: &str = "episode_";
const STEM_DIGITS: usize = 6;

/// Identifier of one episode within a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpisodeId(pub u64);

impl EpisodeId {
    /// Canonical file stem: `episode_` followed by the zero-padded id
    pub fn stem(&self) -> String {
        format!("{}{:0width$}", STEM_PREFIX, self.0, width = STEM_DIGITS)
    }

    /// Parse a canonical stem back into an id
    pub fn from_stem(stem: &str) -> Option<Self> {
        let digits = stem.strip_prefix(STEM_PREFIX)?;
        if digits.len() < STEM_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // A padded form longer than the canonical width would alias a
        // shorter id
        if digits.len() > STEM_DIGITS && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().map(EpisodeId)
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Return true if the path is an episode source file
pub fn is_episode_source(path: &Path) -> bool {
    if !path.is_file() || !path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
        return false;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(EpisodeId::from_stem)
        .is_some()
}

/// Recursively index episode source files under `input_root`.
///
/// The first file found for an id wins; the same stem appearing at
/// another depth is ignored, so an episode is never counted twice.
pub fn source_index(input_root: &Path) -> std::io::Result<BTreeMap<EpisodeId, PathBuf>> {
    let mut index = BTreeMap::new();
    for entry in WalkDir::new(input_root) {
        let entry = entry?;
        let path = entry.path();
        if !is_episode_source(path) {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(EpisodeId::from_stem)
        {
            index.entry(id).or_insert_with(|| path.to_path_buf());
        }
    }
    Ok(index)
}

/// Discover every episode present under `input_root`.
///
/// Zero matches is a valid outcome, not an error.
pub fn discover(input_root: &Path) -> std::io::Result<Vec<EpisodeId>> {
    Ok(source_index(input_root)?.into_keys().collect())
}

/// Resolve the set of episodes to process.
///
/// Explicit ids are taken as given without touching the filesystem; a
/// missing source surfaces later as a per-episode failure. Without
/// explicit ids the input root is searched recursively.
pub fn select(input_root: &Path, explicit_ids: Option<&[u64]>) -> std::io::Result<Vec<EpisodeId>> {
    match explicit_ids {
        Some(ids) if !ids.is_empty() => Ok(ids.iter().copied().map(EpisodeId).collect()),
        _ => discover(input_root),
    }
}
