//! End-to-end stage runs: partition, execute, report.
//!
//! Setup problems (bad config, unreadable manifest, unwritable output root)
//! are returned as errors before any item is dispatched. Once dispatch has
//! started, every item ends up in the returned summary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use clipset_media::{usable_cookies_path, ToolRunner};
use clipset_models::{DownloadItem, VideoManifestEntry};

use crate::config::{CutConfig, DownloadConfig};
use crate::cut_job::{run_cut_job, CutContext};
use crate::download_job::{run_download_job, DownloadContext};
use crate::error::{WorkerError, WorkerResult};
use crate::executor::{BatchExecutor, RunSummary};
use crate::manifest::{load_cut_entries, load_download_items, PartitionOptions};
use crate::report::{write_clip_results, write_failed_videos, write_failure_report};

/// Result of a download stage run.
#[derive(Debug)]
pub struct DownloadRun {
    pub summary: RunSummary,
    /// Failure report, if any item failed.
    pub report_path: Option<PathBuf>,
}

/// Result of a cut stage run.
#[derive(Debug)]
pub struct CutRun {
    pub summary: RunSummary,
    /// Produced clip ids.
    pub clip_ids: Vec<String>,
    /// Videos that produced no clips.
    pub failed_videos: Vec<String>,
    pub result_path: PathBuf,
    pub failed_path: Option<PathBuf>,
}

/// Run the download stage.
pub async fn run_download_stage(
    config: &DownloadConfig,
    runner: Arc<dyn ToolRunner>,
) -> WorkerResult<DownloadRun> {
    config.validate()?;

    let download_dir = config.download_dir();
    ensure_dir(&download_dir).await?;

    let items = load_download_items(
        &config.input,
        &download_dir,
        PartitionOptions {
            shuffle: config.shuffle,
            filter_desirable: config.filter_desirable,
        },
    )?;

    let cookies = config.cookies.as_deref().and_then(usable_cookies_path);

    let ctx = Arc::new(DownloadContext::new(config, cookies, runner));

    info!(
        "Downloading {} videos with {} workers (delay {}-{}s)",
        items.len(),
        config.workers,
        config.delay_min,
        config.delay_max
    );

    let summary = BatchExecutor::new(config.workers)
        .with_label("download")
        .with_progress(config.show_progress)
        .run(items, move |item: Arc<DownloadItem>| {
            let ctx = Arc::clone(&ctx);
            async move { run_download_job(&ctx, &item).await }
        })
        .await;

    let report_path =
        write_failure_report(&config.output_dir, &summary.started_at, &summary.failures)?;

    Ok(DownloadRun {
        summary,
        report_path,
    })
}

/// Run the cut stage.
pub async fn run_cut_stage(config: &CutConfig, runner: Arc<dyn ToolRunner>) -> WorkerResult<CutRun> {
    config.validate()?;

    let layout = config.layout();
    ensure_dir(&layout.clips_root()).await?;
    ensure_dir(&layout.results_dir()).await?;

    let entries = load_cut_entries(&config.metafile)?;
    let ctx = Arc::new(CutContext::new(config, runner));

    let summary = BatchExecutor::new(config.workers)
        .with_label("cut")
        .with_progress(config.show_progress)
        .run(entries, move |entry: Arc<VideoManifestEntry>| {
            let ctx = Arc::clone(&ctx);
            async move { run_cut_job(&ctx, &entry).await }
        })
        .await;

    let clip_ids = summary.artifacts.clone();
    let failed_videos: Vec<String> = summary.failures.iter().map(|f| f.id.clone()).collect();

    info!("Number of clips processed: {}", clip_ids.len());
    info!("Number of failed videos: {}", failed_videos.len());

    let result_path = config.result_path();
    write_clip_results(&result_path, &clip_ids)?;

    let failed_path = config.failed_result_path();
    let failed_path = write_failed_videos(&failed_path, &failed_videos)?.then_some(failed_path);

    Ok(CutRun {
        summary,
        clip_ids,
        failed_videos,
        result_path,
        failed_path,
    })
}

async fn ensure_dir(path: &Path) -> WorkerResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| WorkerError::output_unwritable(path, e))
}
