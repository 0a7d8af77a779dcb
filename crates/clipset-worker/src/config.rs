//! Run configuration for the download and cut stages.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clipset_models::quality::DEFAULT_FORMAT_SELECTOR;
use clipset_models::Quality;
use tracing::warn;

use crate::error::{WorkerError, WorkerResult};
use crate::retry::{DelayRange, RetryPolicy};

/// Wall-clock budget for one yt-dlp invocation.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Download stage configuration.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Manifest CSV with `videoID` and `url` columns
    pub input: PathBuf,
    /// Output root; videos land in `{output_dir}/download/`
    pub output_dir: PathBuf,
    /// Concurrent downloads
    pub workers: usize,
    pub proxy: Option<String>,
    /// Post-success throttle range, in seconds
    pub delay_min: f64,
    pub delay_max: f64,
    /// Extra attempts per strategy
    pub retry: u32,
    pub cookies: Option<PathBuf>,
    /// Requested quality as given on the command line; unknown values fall back to 720p
    pub quality: String,
    pub shuffle: bool,
    pub filter_desirable: bool,
    pub log_file: Option<PathBuf>,
    pub show_progress: bool,
    /// Timeout for a single yt-dlp invocation
    pub tool_timeout: Duration,
    /// Backoff after a rate-limited attempt
    pub rate_limit_backoff: DelayRange,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::from("./download_videos"),
            workers: 2, // Small on purpose: the remote host rate-limits
            proxy: None,
            delay_min: 2.0,
            delay_max: 5.0,
            retry: 2,
            cookies: None,
            quality: Quality::default().to_string(),
            shuffle: false,
            filter_desirable: false,
            log_file: None,
            show_progress: true,
            tool_timeout: DOWNLOAD_TIMEOUT,
            rate_limit_backoff: DelayRange::new(30.0, 60.0),
        }
    }
}

impl DownloadConfig {
    /// Directory holding the downloaded videos.
    pub fn download_dir(&self) -> PathBuf {
        self.output_dir.join("download")
    }

    /// yt-dlp format selector for the requested quality.
    pub fn format_selector(&self) -> &'static str {
        if let Err(e) = self.quality.parse::<Quality>() {
            warn!("{}; falling back to {}", e, DEFAULT_FORMAT_SELECTOR);
        }
        Quality::selector_for(&self.quality)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_retries(self.retry)
            .success_delay(DelayRange::new(self.delay_min, self.delay_max))
            .rate_limit_backoff(self.rate_limit_backoff)
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> WorkerResult<()> {
        validate_workers(self.workers)?;

        if self.delay_min < 0.0 || self.delay_max < 0.0 {
            return Err(WorkerError::config_error("delays must not be negative"));
        }
        if self.delay_min > self.delay_max {
            return Err(WorkerError::config_error(format!(
                "delay-min ({}) is greater than delay-max ({})",
                self.delay_min, self.delay_max
            )));
        }
        if self.tool_timeout.is_zero() {
            return Err(WorkerError::config_error("tool timeout must be positive"));
        }
        Ok(())
    }
}

/// Cut stage configuration.
#[derive(Debug, Clone)]
pub struct CutConfig {
    pub workdir: PathBuf,
    /// Manifest CSV with `videoID`, `url` and `timestamp` columns
    pub metafile: PathBuf,
    /// Name of the result file under `cut_video_results/`
    pub resultfile: String,
    /// Name of the log file under `cut_video_log/`
    pub log: String,
    pub workers: usize,
    /// Timeout for a single ffmpeg invocation
    pub clip_timeout: Duration,
    pub show_progress: bool,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("./hdvila_100m"),
            metafile: PathBuf::from("meta_part0.csv"),
            resultfile: "cut_part0.jsonl".to_string(),
            log: "log_part0.log".to_string(),
            workers: 4,
            clip_timeout: Duration::from_secs(300),
            show_progress: true,
        }
    }
}

impl CutConfig {
    pub fn layout(&self) -> CutLayout {
        CutLayout::new(&self.workdir)
    }

    /// `{workdir}/cut_video_log/{log}`
    pub fn log_path(&self) -> PathBuf {
        self.layout().log_dir().join(&self.log)
    }

    /// `{workdir}/cut_video_results/{resultfile}`
    pub fn result_path(&self) -> PathBuf {
        self.layout().results_dir().join(&self.resultfile)
    }

    /// `{workdir}/cut_video_results/failed_{resultfile}`
    pub fn failed_result_path(&self) -> PathBuf {
        self.layout()
            .results_dir()
            .join(format!("failed_{}", self.resultfile))
    }

    pub fn validate(&self) -> WorkerResult<()> {
        validate_workers(self.workers)?;

        if self.resultfile.trim().is_empty() {
            return Err(WorkerError::config_error("resultfile must not be empty"));
        }
        if self.log.trim().is_empty() {
            return Err(WorkerError::config_error("log must not be empty"));
        }
        if self.clip_timeout.is_zero() {
            return Err(WorkerError::config_error("clip timeout must be positive"));
        }
        Ok(())
    }
}

/// Fixed directory layout under the cut stage working directory.
///
/// Every per-item path embeds the item's id, so concurrent workers never
/// write the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutLayout {
    workdir: PathBuf,
}

impl CutLayout {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn download_dir(&self) -> PathBuf {
        self.workdir.join("download")
    }

    pub fn clips_root(&self) -> PathBuf {
        self.workdir.join("video_clips")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.workdir.join("cut_video_results")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.workdir.join("cut_video_log")
    }

    /// `download/{video_id}.mp4`
    pub fn source_path(&self, video_id: &str) -> PathBuf {
        self.download_dir().join(format!("{}.mp4", video_id))
    }

    /// `video_clips/{video_id}`
    pub fn clip_dir(&self, video_id: &str) -> PathBuf {
        self.clips_root().join(video_id)
    }

    /// `video_clips/{video_id}/{clip_id}.mp4`
    pub fn clip_path(&self, video_id: &str, clip_id: &str) -> PathBuf {
        self.clip_dir(video_id).join(format!("{}.mp4", clip_id))
    }
}

fn validate_workers(workers: usize) -> WorkerResult<()> {
    if workers == 0 {
        return Err(WorkerError::config_error("workers must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_defaults() {
        let config = DownloadConfig::default();
        assert_eq!(config.workers, 2);
        assert_eq!(config.retry, 2);
        assert_eq!(config.quality, "720");
        assert_eq!(config.format_selector(), "best[height<=720]");
        assert_eq!(config.tool_timeout, Duration::from_secs(600));
        assert_eq!(config.download_dir(), PathBuf::from("./download_videos/download"));

        let policy = config.retry_policy();
        assert_eq!(policy.attempts_per_strategy, 3);
        assert_eq!(policy.success_delay, DelayRange::new(2.0, 5.0));
    }

    #[test]
    fn test_download_validation() {
        assert!(DownloadConfig::default().validate().is_ok());

        let no_workers = DownloadConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(no_workers.validate(), Err(WorkerError::ConfigError(_))));

        let inverted = DownloadConfig {
            delay_min: 6.0,
            delay_max: 1.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_unknown_quality_falls_back_to_720p() {
        let config = DownloadConfig {
            quality: "240".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.format_selector(), DEFAULT_FORMAT_SELECTOR);

        let config = DownloadConfig {
            quality: "1080".to_string(),
            ..Default::default()
        };
        assert_eq!(config.format_selector(), "best[height<=1080]");
    }

    #[test]
    fn test_cut_paths() {
        let config = CutConfig {
            workdir: PathBuf::from("/data/hd"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.log_path(), PathBuf::from("/data/hd/cut_video_log/log_part0.log"));
        assert_eq!(
            config.result_path(),
            PathBuf::from("/data/hd/cut_video_results/cut_part0.jsonl")
        );
        assert_eq!(
            config.failed_result_path(),
            PathBuf::from("/data/hd/cut_video_results/failed_cut_part0.jsonl")
        );

        let layout = config.layout();
        assert_eq!(layout.source_path("abc"), PathBuf::from("/data/hd/download/abc.mp4"));
        assert_eq!(
            layout.clip_path("abc", "abc_001"),
            PathBuf::from("/data/hd/video_clips/abc/abc_001.mp4")
        );
    }

    #[test]
    fn test_cut_validation() {
        let config = CutConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CutConfig {
            resultfile: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
