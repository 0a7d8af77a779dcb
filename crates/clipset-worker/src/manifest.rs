//! Manifest loading and work partitioning.
//!
//! Turns the CSV manifest into the finite list of work items for a run.
//! A manifest that cannot be opened, or that lacks a required column, is
//! fatal. A single malformed row is not: it is logged and dropped.

use std::path::Path;

use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use clipset_models::{DownloadItem, Timestamp, TimestampError, VideoManifestEntry};

use crate::classify::ErrorKind;
use crate::error::{WorkerError, WorkerResult};

/// Accepted spellings of the id column. `video_id` lets a failure report be
/// fed straight back in as a download manifest.
pub const VIDEO_ID_COLUMNS: &[&str] = &["videoID", "video_id"];
pub const URL_COLUMNS: &[&str] = &["url"];
pub const TIMESTAMP_COLUMNS: &[&str] = &["timestamp"];

/// Why a single manifest row was rejected.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Timestamp list is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid timestamp in span {index}: {source}")]
    InvalidTimestamp {
        index: usize,
        #[source]
        source: TimestampError,
    },
}

/// How to shape the download work list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionOptions {
    /// Randomize dispatch order.
    pub shuffle: bool,
    /// Keep only rows tagged `desirable`.
    pub filter_desirable: bool,
}

#[derive(Debug, Deserialize)]
struct DownloadRow {
    #[serde(rename = "videoID", alias = "video_id")]
    video_id: String,
    url: String,
    #[serde(default)]
    desirable_filtering: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CutRow {
    #[serde(rename = "videoID", alias = "video_id")]
    video_id: String,
    url: String,
    timestamp: String,
}

/// Load download work items from `path`.
///
/// Each item's destination is `{download_dir}/{videoID}.mp4`.
pub fn load_download_items(
    path: &Path,
    download_dir: &Path,
    options: PartitionOptions,
) -> WorkerResult<Vec<DownloadItem>> {
    let mut reader = open_manifest(path, &[VIDEO_ID_COLUMNS, URL_COLUMNS])?;

    let mut items = Vec::new();
    let mut filtered = 0usize;
    for (line, row) in reader.deserialize::<DownloadRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(
                    row = line + 1,
                    kind = %ErrorKind::ParseError,
                    "Skipping unreadable manifest row: {}", e
                );
                continue;
            }
        };

        if options.filter_desirable && !is_desirable(row.desirable_filtering.as_deref()) {
            filtered += 1;
            continue;
        }

        let output_path = download_dir.join(format!("{}.mp4", row.video_id));
        items.push(DownloadItem::new(row.video_id, row.url, output_path));
    }

    if options.filter_desirable {
        info!("Filtered out {} rows not tagged desirable", filtered);
    }

    if options.shuffle {
        items.shuffle(&mut rand::rng());
    }

    info!("Loaded {} download items from {}", items.len(), path.display());
    Ok(items)
}

/// Load cut manifest entries from `path`.
///
/// Rows whose `timestamp` field does not parse are dropped with a warning.
/// Rows with an empty span list are kept.
pub fn load_cut_entries(path: &Path) -> WorkerResult<Vec<VideoManifestEntry>> {
    let mut reader = open_manifest(path, &[VIDEO_ID_COLUMNS, URL_COLUMNS, TIMESTAMP_COLUMNS])?;

    let mut entries = Vec::new();
    let mut dropped = 0usize;
    for (line, row) in reader.deserialize::<CutRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(
                    row = line + 1,
                    kind = %ErrorKind::ParseError,
                    "Skipping unreadable manifest row: {}", e
                );
                dropped += 1;
                continue;
            }
        };

        match parse_timestamp_field(&row.timestamp) {
            Ok(spans) => {
                if spans.is_empty() {
                    warn!(video_id = %row.video_id, "Manifest row has no clip spans");
                }
                entries.push(VideoManifestEntry::from_spans(row.video_id, row.url, spans));
            }
            Err(e) => {
                warn!(
                    video_id = %row.video_id,
                    kind = %ErrorKind::ParseError,
                    raw = %row.timestamp,
                    "Failed to parse timestamp field: {}", e
                );
                dropped += 1;
            }
        }
    }

    info!(
        "Loaded {} cut entries from {} ({} rows dropped)",
        entries.len(),
        path.display(),
        dropped
    );
    Ok(entries)
}

/// Parse a serialized list of `[start, end]` pairs.
///
/// Accepts an extra layer of double quotes around the whole list and
/// single-quoted string literals, e.g. `"[['00:00:01.000', '00:00:03.500']]"`.
pub fn parse_timestamp_field(raw: &str) -> Result<Vec<(Timestamp, Timestamp)>, ManifestError> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    let normalized = unquoted.replace('\'', "\"");

    let pairs: Vec<(String, String)> = serde_json::from_str(&normalized)?;

    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| {
            let start = start
                .parse()
                .map_err(|source| ManifestError::InvalidTimestamp { index, source })?;
            let end = end
                .parse()
                .map_err(|source| ManifestError::InvalidTimestamp { index, source })?;
            Ok((start, end))
        })
        .collect()
}

/// Whether a `desirable_filtering` value contains the `desirable` token.
pub fn is_desirable(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        v.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .any(|token| token.eq_ignore_ascii_case("desirable"))
    })
}

/// Open `path` and check that every group in `required` has at least one
/// of its column names present in the header row.
fn open_manifest(
    path: &Path,
    required: &[&[&str]],
) -> WorkerResult<csv::Reader<std::fs::File>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| WorkerError::ManifestUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| WorkerError::ManifestUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    for names in required {
        let present = headers.iter().any(|h| names.contains(&h.trim()));
        if !present {
            return Err(WorkerError::missing_column(path, names.first().copied().unwrap_or("")));
        }
    }

    Ok(reader)
}
