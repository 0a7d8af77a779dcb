//! Cut stage per-item worker.
//!
//! One item is one source video with all of its clip spans. Clips are cut
//! in manifest order; a clip that fails is logged and skipped so the rest
//! of the video's clips still get cut.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use clipset_media::{build_cut_command, remove_if_exists, ToolRunner, ERROR_EXCERPT_CHARS};
use clipset_models::{ClipSpan, Outcome, VideoManifestEntry};

use crate::classify::ErrorKind;
use crate::config::{CutConfig, CutLayout};
use crate::logging::JobLogger;

/// Everything a cut worker needs besides the item itself.
pub struct CutContext {
    runner: Arc<dyn ToolRunner>,
    layout: CutLayout,
    clip_timeout: Duration,
}

impl CutContext {
    pub fn new(config: &CutConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            layout: config.layout(),
            clip_timeout: config.clip_timeout,
        }
    }

    pub fn layout(&self) -> &CutLayout {
        &self.layout
    }
}

/// Cut every clip of `entry`.
///
/// Returns the ids of the clips that were produced, in manifest order.
/// An absent source video yields an empty list.
pub async fn extract_clips(ctx: &CutContext, entry: &VideoManifestEntry) -> Vec<String> {
    let logger = JobLogger::new(&entry.video_id, "cut");
    let source = ctx.layout.source_path(&entry.video_id);

    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        warn!(
            video_id = %entry.video_id,
            kind = %ErrorKind::SourceMissing,
            "Video file not found: {}", source.display()
        );
        return Vec::new();
    }

    let clip_dir = ctx.layout.clip_dir(&entry.video_id);
    if let Err(e) = tokio::fs::create_dir_all(&clip_dir).await {
        logger.log_error(&format!("Cannot create {}: {}", clip_dir.display(), e));
        return Vec::new();
    }

    let mut produced = Vec::with_capacity(entry.clips.len());
    for span in &entry.clips {
        match cut_clip(ctx, entry, span).await {
            Ok(()) => produced.push(span.clip_id.clone()),
            Err(message) => error!(
                video_id = %entry.video_id,
                clip_id = %span.clip_id,
                "Failed to extract clip: {}", message
            ),
        }
    }

    logger.log_completion(&format!("{}/{} clips", produced.len(), entry.clips.len()));
    produced
}

/// Cut one video and wrap the result as an outcome.
///
/// A video that yields no clips at all is a failure, so it lands in the
/// failed-video list.
pub async fn run_cut_job(ctx: &CutContext, entry: &VideoManifestEntry) -> Outcome {
    let produced = extract_clips(ctx, entry).await;

    if !produced.is_empty() {
        return Outcome::success_with(entry, produced);
    }

    let source = ctx.layout.source_path(&entry.video_id);
    let reason = if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        format!("source video not found: {}", source.display())
    } else if entry.clips.is_empty() {
        "manifest lists no clips".to_string()
    } else {
        format!("none of {} clips could be extracted", entry.clips.len())
    };
    Outcome::failure(entry, reason)
}

async fn cut_clip(
    ctx: &CutContext,
    entry: &VideoManifestEntry,
    span: &ClipSpan,
) -> Result<(), String> {
    span.validate().map_err(|e| e.to_string())?;

    let source = ctx.layout.source_path(&entry.video_id);
    let output = ctx.layout.clip_path(&entry.video_id, &span.clip_id);

    // Only a file produced by this invocation counts as success.
    remove_if_exists(&output)
        .await
        .map_err(|e| format!("cannot remove stale output: {}", e))?;

    let command = build_cut_command(span, &source, &output);
    debug!(clip_id = %span.clip_id, "Running {}", command);

    let result = ctx
        .runner
        .invoke(&command, ctx.clip_timeout)
        .await
        .map_err(|e| e.to_string())?;

    if tokio::fs::try_exists(&output).await.unwrap_or(false) {
        Ok(())
    } else {
        Err(format!(
            "{}: ffmpeg clip extraction failed (exit {:?}): {}",
            output.display(),
            result.exit_code,
            result.error_excerpt(ERROR_EXCERPT_CHARS)
        ))
    }
}
