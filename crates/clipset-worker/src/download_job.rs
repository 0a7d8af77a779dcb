//! Download stage per-item worker.
//!
//! Flow for one item:
//! 1. Skip if the destination already holds a complete file
//! 2. Delete an undersized leftover and any partial sidecar files
//! 3. Try each strategy in order, each with its own attempt budget
//! 4. Throttle after success, back off after rate limiting
//!
//! Attempts within an item are strictly sequential since they share the
//! destination path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use clipset_media::{
    build_download_command, file_size, is_complete_file, remove_if_exists,
    remove_partial_artifacts, truncate_chars, ToolOptions, ToolRunner, ERROR_EXCERPT_CHARS,
};
use clipset_models::{DownloadItem, Outcome};

use crate::classify::{classify_output, ErrorKind};
use crate::config::DownloadConfig;
use crate::logging::JobLogger;
use crate::retry::RetryPolicy;

/// One variant of the download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadStrategy {
    pub name: String,
    /// Replaces the configured quality selector when set.
    pub format_override: Option<String>,
    /// Appended to the tool's argument list.
    pub extra_args: Vec<String>,
}

impl DownloadStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format_override: None,
            extra_args: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format_override = Some(format.into());
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Direct download with the full option set.
    pub fn standard() -> Self {
        Self::new("standard")
    }
}

/// Strategies tried for every item, in order.
pub fn default_strategies() -> Vec<DownloadStrategy> {
    vec![DownloadStrategy::standard()]
}

/// Everything a download worker needs besides the item itself.
///
/// Shared read-only across all workers of a run.
pub struct DownloadContext {
    runner: Arc<dyn ToolRunner>,
    strategies: Vec<DownloadStrategy>,
    quality_selector: String,
    proxy: Option<String>,
    cookies_path: Option<PathBuf>,
    policy: RetryPolicy,
    tool_timeout: Duration,
}

impl DownloadContext {
    /// Build a context from a validated config.
    ///
    /// `cookies_path` should already have been checked with
    /// `usable_cookies_path`.
    pub fn new(
        config: &DownloadConfig,
        cookies_path: Option<PathBuf>,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        Self {
            runner,
            strategies: default_strategies(),
            quality_selector: config.format_selector().to_string(),
            proxy: config.proxy.clone(),
            cookies_path,
            policy: config.retry_policy(),
            tool_timeout: config.tool_timeout,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<DownloadStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

}

/// Download one item. Never fails: every problem becomes a `Failure` outcome.
pub async fn run_download_job(ctx: &DownloadContext, item: &DownloadItem) -> Outcome {
    let logger = JobLogger::new(&item.id, "download");
    let output = &item.output_path;

    if is_complete_file(output).await {
        debug!(video_id = %item.id, "Already downloaded, skipping");
        return Outcome::skipped(item, "already downloaded");
    }

    if let Some(size) = file_size(output).await {
        logger.log_warning(&format!("Removing undersized file ({} bytes)", size));
        if let Err(e) = remove_if_exists(output).await {
            return Outcome::failure(item, format!("cannot remove undersized file: {}", e));
        }
    }

    if let Some(parent) = output.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return Outcome::failure(item, format!("cannot create {}: {}", parent.display(), e));
        }
    }

    logger.log_start(&item.source_url);

    let mut last_error = String::from("no download strategies configured");

    for strategy in &ctx.strategies {
        let attempts = ctx.policy.attempts_per_strategy.max(1);
        for attempt in 1..=attempts {
            logger.log_progress(&format!(
                "{} attempt {}/{}",
                strategy.name, attempt, attempts
            ));
            if let Err(e) = remove_partial_artifacts(output).await {
                logger.log_warning(&format!("Failed to clean partial files: {}", e));
            }

            let options = ToolOptions::randomized(
                ctx.quality_selector.as_str(),
                ctx.proxy.clone(),
                ctx.cookies_path.clone(),
            );
            let command = build_download_command(
                &item.source_url,
                output,
                &options,
                strategy.format_override.as_deref(),
                &strategy.extra_args,
            );

            let invocation = ctx.runner.invoke(&command, ctx.tool_timeout).await;
            let produced =
                matches!(&invocation, Ok(r) if r.success()) && is_complete_file(output).await;

            let kind = match invocation {
                Ok(_) if produced => {
                    let delay = ctx.policy.success_delay.sleep("post-download throttle").await;
                    info!(
                        video_id = %item.id,
                        strategy = %strategy.name,
                        attempt,
                        throttle_secs = delay.as_secs_f64(),
                        "Download succeeded"
                    );
                    return Outcome::success(item);
                }
                Ok(result) => {
                    let excerpt = if result.success() {
                        "exited successfully but output is missing or undersized".to_string()
                    } else {
                        result.error_excerpt(ERROR_EXCERPT_CHARS)
                    };
                    last_error = format!("{} failed: {}", strategy.name, excerpt);
                    classify_output(&result.stderr)
                }
                Err(e) if e.is_timeout() => {
                    last_error = format!(
                        "{} timed out after {}s",
                        strategy.name,
                        ctx.tool_timeout.as_secs()
                    );
                    ErrorKind::TimeoutExceeded
                }
                Err(e) => {
                    last_error = truncate_chars(
                        &format!("{} error: {}", strategy.name, e),
                        ERROR_EXCERPT_CHARS,
                    );
                    ErrorKind::ToolInvocationFailed
                }
            };

            warn!(
                video_id = %item.id,
                strategy = %strategy.name,
                attempt,
                kind = %kind,
                "Download attempt failed: {}", last_error
            );

            if kind.needs_backoff() {
                ctx.policy.rate_limit_backoff.sleep("rate limited").await;
            }
            if kind.abandons_strategy() {
                break;
            }
        }
    }

    if let Err(e) = remove_partial_artifacts(output).await {
        logger.log_warning(&format!("Failed to clean partial files: {}", e));
    }

    logger.log_error(&last_error);
    Outcome::failure(item, last_error)
}
