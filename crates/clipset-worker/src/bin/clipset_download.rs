//! Batch video downloader.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use clipset_media::{check_ytdlp, ProcessRunner};
use clipset_worker::{init_tracing, run_download_stage, DownloadConfig};

#[derive(Debug, Parser)]
#[command(
    name = "clipset-download",
    about = "Download every video listed in a CSV manifest with yt-dlp"
)]
struct Args {
    /// Manifest CSV with videoID and url columns
    #[arg(short, long, env = "CLIPSET_INPUT")]
    input: PathBuf,

    /// Output root; videos are written to {output}/download/
    #[arg(short, long, env = "CLIPSET_OUTPUT", default_value = "./download_videos")]
    output: PathBuf,

    /// Concurrent downloads
    #[arg(short, long, env = "CLIPSET_WORKERS", default_value_t = 2)]
    workers: usize,

    /// Proxy URL, e.g. socks5://127.0.0.1:1080
    #[arg(short, long, env = "CLIPSET_PROXY")]
    proxy: Option<String>,

    /// Minimum delay after each successful download (seconds)
    #[arg(long, env = "CLIPSET_DELAY_MIN", default_value_t = 2.0)]
    delay_min: f64,

    /// Maximum delay after each successful download (seconds)
    #[arg(long, env = "CLIPSET_DELAY_MAX", default_value_t = 5.0)]
    delay_max: f64,

    /// Extra attempts per download strategy
    #[arg(short, long, env = "CLIPSET_RETRY", default_value_t = 2)]
    retry: u32,

    /// Netscape-format cookies file
    #[arg(short, long, env = "CLIPSET_COOKIES")]
    cookies: Option<PathBuf>,

    /// Maximum quality: 360, 480, 720, 1080 or best (anything else means 720)
    #[arg(short, long, env = "CLIPSET_QUALITY", default_value = "720")]
    quality: String,

    /// Randomize download order
    #[arg(long, env = "CLIPSET_SHUFFLE")]
    shuffle: bool,

    /// Only download rows whose desirable_filtering column says desirable
    #[arg(long, env = "CLIPSET_FILTER_DESIRABLE")]
    filter_desirable: bool,

    /// Write logs to this file; the console then only shows warnings
    #[arg(long, env = "CLIPSET_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Disable the progress bar; info logs then go to the console
    #[arg(long, env = "CLIPSET_NO_PROGRESS")]
    no_progress: bool,
}

impl Args {
    fn into_config(self) -> DownloadConfig {
        DownloadConfig {
            input: self.input,
            output_dir: self.output,
            workers: self.workers,
            proxy: self.proxy,
            delay_min: self.delay_min,
            delay_max: self.delay_max,
            retry: self.retry,
            cookies: self.cookies,
            quality: self.quality,
            shuffle: self.shuffle,
            filter_desirable: self.filter_desirable,
            log_file: self.log_file,
            show_progress: !self.no_progress,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Args::parse().into_config();
    init_tracing(config.log_file.as_deref(), config.show_progress)?;

    info!("Starting clipset-download");
    info!("Download config: {:?}", config);

    let ytdlp = check_ytdlp().context("yt-dlp must be installed and on PATH")?;
    info!("Using yt-dlp at {}", ytdlp.display());

    let run = run_download_stage(&config, Arc::new(ProcessRunner::new())).await?;
    let summary = &run.summary;

    if let Some(path) = &run.report_path {
        println!("\nFailure report saved to: {}", path.display());
    }

    println!("\n{}", "=".repeat(50));
    println!("Download finished in {:.1} minutes", summary.elapsed_minutes());
    println!("Success: {}", summary.success_count);
    println!("Skipped: {}", summary.skip_count);
    println!("Failed: {}", summary.failure_count());
    println!("Total: {}", summary.total);
    println!("{}", "=".repeat(50));

    Ok(())
}
