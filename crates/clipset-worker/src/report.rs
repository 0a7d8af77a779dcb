//! Failure reporting and result files.
//!
//! Download failures go to a CSV named after the run's start time, so
//! repeated runs never overwrite each other's reports. The cut stage writes
//! JSON-lines files of produced clip ids and of videos that produced none.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use clipset_models::FailureRecord;

use crate::error::WorkerResult;

/// Column layout of the download failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRow {
    pub video_id: String,
    pub url: String,
    pub error: String,
    pub timestamp: String,
}

impl From<&FailureRecord> for FailureRow {
    fn from(record: &FailureRecord) -> Self {
        Self {
            video_id: record.id.clone(),
            url: record.locator.clone(),
            error: record.error.clone(),
            timestamp: record.timestamp_display(),
        }
    }
}

/// `failed_downloads_{YYYYmmdd_HHMMSS}.csv`
pub fn failure_report_name(started_at: &DateTime<Local>) -> String {
    format!(
        "failed_downloads_{}.csv",
        started_at.format("%Y%m%d_%H%M%S")
    )
}

/// Write one row per failure into `dir`.
///
/// Returns the report path, or `None` (and writes nothing) if there were
/// no failures.
pub fn write_failure_report(
    dir: &Path,
    started_at: &DateTime<Local>,
    failures: &[FailureRecord],
) -> WorkerResult<Option<PathBuf>> {
    if failures.is_empty() {
        return Ok(None);
    }

    let path = dir.join(failure_report_name(started_at));
    let mut writer = csv::Writer::from_path(&path)?;
    for record in failures {
        writer.serialize(FailureRow::from(record))?;
    }
    writer.flush()?;

    info!("Wrote {} failures to {}", failures.len(), path.display());
    Ok(Some(path))
}

/// Read a failure report back.
pub fn read_failure_report(path: &Path) -> WorkerResult<Vec<FailureRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<FailureRow>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Serialize)]
struct FailedVideo<'a> {
    video_id: &'a str,
    status: &'static str,
}

/// Write produced clip ids as JSON strings, one per line.
pub fn write_clip_results(path: &Path, clip_ids: &[String]) -> WorkerResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for clip_id in clip_ids {
        serde_json::to_writer(&mut writer, clip_id)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `{"video_id": ..., "status": "failed"}` lines.
///
/// Nothing is written when `video_ids` is empty. Returns whether the file
/// was written.
pub fn write_failed_videos(path: &Path, video_ids: &[String]) -> WorkerResult<bool> {
    if video_ids.is_empty() {
        return Ok(false);
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for video_id in video_ids {
        let line = FailedVideo {
            video_id,
            status: "failed",
        };
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!("Failed videos saved to: {}", path.display());
    Ok(true)
}
