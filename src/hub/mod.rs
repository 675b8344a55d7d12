//! Dataset acquisition from the Hugging Face Hub
//!
//! Lists a dataset repository's file tree through the Hub API and streams
//! the selected files to disk. When an explicit episode list is given only
//! the matching episode source files are fetched; everything else in the
//! repository (metadata, stats, videos) is kept so the downloaded tree
//! stays usable as a dataset root.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::dataset::{EpisodeId, SOURCE_EXTENSION};
use crate::error::{AcquisitionError, AcquisitionResult};

const HUB_ENDPOINT: &str = "https://huggingface.co";
const HUB_REVISION: &str = "main";

/// One entry of a repository tree listing
#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

/// What a completed download fetched
#[derive(Debug, Clone, Copy)]
pub struct DownloadSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Blocking client for one Hub dataset repository
pub struct HubClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HubClient {
    /// Client against the public Hub, authenticated via `HF_TOKEN` when set.
    pub fn new() -> AcquisitionResult<Self> {
        Self::with_endpoint(HUB_ENDPOINT)
    }

    /// Client against an alternative endpoint (used by tests and mirrors).
    pub fn with_endpoint(endpoint: &str) -> AcquisitionResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("mcapconv/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// List every file path in the dataset repository, following the
    /// `Link: rel="next"` pagination of the tree API.
    pub fn list_files(&self, dataset_id: &str) -> AcquisitionResult<Vec<String>> {
        let mut files = Vec::new();
        let mut url = format!(
            "{}/api/datasets/{}/tree/{}?recursive=true",
            self.endpoint, dataset_id, HUB_REVISION
        );
        loop {
            let response = self.get(&url).send()?;
            match response.status() {
                StatusCode::NOT_FOUND => {
                    return Err(AcquisitionError::DatasetNotFound {
                        id: dataset_id.to_string(),
                    })
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(AcquisitionError::Unauthorized {
                        id: dataset_id.to_string(),
                    })
                }
                status if !status.is_success() => {
                    return Err(AcquisitionError::protocol(format!(
                        "tree listing returned {status}"
                    )))
                }
                _ => {}
            }
            let next = next_page(response.headers());
            let entries: Vec<TreeEntry> = response.json()?;
            files.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.kind == "file")
                    .map(|entry| entry.path),
            );
            match next {
                Some(next_url) => url = next_url,
                None => break,
            }
        }
        Ok(files)
    }

    /// Stream one repository file to `dest`, creating parent directories.
    /// Returns the number of bytes written.
    pub fn download_file(
        &self,
        dataset_id: &str,
        repo_path: &str,
        dest: &Path,
    ) -> AcquisitionResult<u64> {
        let url = format!(
            "{}/datasets/{}/resolve/{}/{}",
            self.endpoint, dataset_id, HUB_REVISION, repo_path
        );
        let mut response = self.get(&url).send()?;
        if !response.status().is_success() {
            return Err(AcquisitionError::protocol(format!(
                "download of '{repo_path}' returned {}",
                response.status()
            )));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| AcquisitionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut out = File::create(dest).map_err(|source| AcquisitionError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        let bytes = io::copy(&mut response, &mut out).map_err(|source| AcquisitionError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(bytes)
    }
}

/// Progress bar advancing once per fetched repository file; the message
/// slot shows the file currently being streamed.
fn download_progress(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} fetching [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
        )
        .expect("download progress template is valid")
        .progress_chars("=> "),
    );
    bar
}

/// Parse the next-page URL from a `Link` response header.
fn next_page(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let link = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (url, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|param| param.trim().eq_ignore_ascii_case("rel=\"next\""))
            .then(|| {
                url.trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}

/// Whether a repository file should be fetched under the episode filter.
///
/// Without a filter everything is fetched. With a filter, episode source
/// files outside the requested set are skipped; non-episode files are
/// always kept.
fn wanted(repo_path: &str, episodes: Option<&[u64]>) -> bool {
    let Some(episodes) = episodes else {
        return true;
    };
    let name = repo_path.rsplit('/').next().unwrap_or(repo_path);
    let Some(stem) = name.strip_suffix(&format!(".{SOURCE_EXTENSION}")) else {
        return true;
    };
    match EpisodeId::from_stem(stem) {
        Some(id) => episodes.contains(&id.0),
        None => true,
    }
}

/// Download a dataset from the Hub into `output_dir`.
///
/// Fatal on any failure; a partly downloaded tree is left on disk so a
/// re-run can overwrite it.
pub fn download_dataset(
    dataset_id: &str,
    output_dir: &Path,
    episodes: Option<&[u64]>,
    quiet: bool,
) -> AcquisitionResult<DownloadSummary> {
    let client = HubClient::new()?;
    let selected: Vec<String> = client
        .list_files(dataset_id)?
        .into_iter()
        .filter(|path| wanted(path, episodes))
        .collect();
    if selected.is_empty() {
        return Err(AcquisitionError::protocol(format!(
            "dataset '{dataset_id}' contains no files to download"
        )));
    }

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        download_progress(selected.len() as u64)
    };
    let mut bytes = 0u64;
    for repo_path in &selected {
        progress.set_message(repo_path.clone());
        let dest: PathBuf = output_dir.join(repo_path);
        bytes += client.download_file(dataset_id, repo_path, &dest)?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(DownloadSummary {
        files: selected.len(),
        bytes,
    })
}
