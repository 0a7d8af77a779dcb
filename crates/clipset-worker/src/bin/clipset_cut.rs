//! Batch clip cutter.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use clipset_media::{check_ffmpeg, ProcessRunner};
use clipset_worker::{init_tracing, run_cut_stage, CutConfig};

#[derive(Debug, Parser)]
#[command(
    name = "clipset-cut",
    about = "Cut downloaded videos into clips listed in a CSV manifest"
)]
struct Args {
    /// Working directory holding download/, video_clips/ and the results
    #[arg(long, env = "CLIPSET_WORKDIR", default_value = "./hdvila_100m")]
    workdir: PathBuf,

    /// Manifest CSV with videoID, url and timestamp columns
    #[arg(long, env = "CLIPSET_METAFILE", default_value = "meta_part0.csv")]
    metafile: PathBuf,

    /// Result file name under cut_video_results/
    #[arg(long, env = "CLIPSET_RESULTFILE", default_value = "cut_part0.jsonl")]
    resultfile: String,

    /// Log file name under cut_video_log/
    #[arg(long, env = "CLIPSET_LOG", default_value = "log_part0.log")]
    log: String,

    /// Videos cut in parallel
    #[arg(long, env = "CLIPSET_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Timeout for a single ffmpeg invocation (seconds)
    #[arg(long, env = "CLIPSET_CLIP_TIMEOUT_SECS", default_value_t = 300)]
    clip_timeout_secs: u64,

    /// Disable the progress bar
    #[arg(long, env = "CLIPSET_NO_PROGRESS")]
    no_progress: bool,
}

impl Args {
    fn into_config(self) -> CutConfig {
        CutConfig {
            workdir: self.workdir,
            metafile: self.metafile,
            resultfile: self.resultfile,
            log: self.log,
            workers: self.workers,
            clip_timeout: Duration::from_secs(self.clip_timeout_secs),
            show_progress: !self.no_progress,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Args::parse().into_config();
    let log_path = config.log_path();
    init_tracing(Some(log_path.as_path()), config.show_progress)?;

    info!("Starting clipset-cut");
    info!("Cut config: {:?}", config);

    check_ffmpeg().context("ffmpeg must be installed and on PATH")?;

    let run = run_cut_stage(&config, Arc::new(ProcessRunner::new())).await?;

    println!("\n{}", "=".repeat(50));
    println!("Cut finished in {:.1} minutes", run.summary.elapsed_minutes());
    println!("Clips produced: {}", run.clip_ids.len());
    println!("Videos with clips: {}", run.summary.success_count);
    println!("Failed videos: {}", run.failed_videos.len());
    println!("Total videos: {}", run.summary.total);
    println!("Results: {}", run.result_path.display());
    if let Some(path) = &run.failed_path {
        println!("Failed videos saved to: {}", path.display());
    }
    println!("{}", "=".repeat(50));

    Ok(())
}
