//! Clip cutting command construction for FFmpeg.
//!
//! Clips are cut with stream copy (no re-encode) and timestamp reset, so a
//! cut is I/O bound and keyframe-aligned by FFmpeg's accurate seek.

use std::path::Path;

use clipset_models::ClipSpan;

use crate::command::ToolCommand;

/// Program name of the cutting tool.
pub const FFMPEG_PROGRAM: &str = "ffmpeg";

/// Build the FFmpeg command that cuts `span` out of `input` into `output`.
pub fn build_cut_command(span: &ClipSpan, input: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new(FFMPEG_PROGRAM)
        .opt("-ss", span.start.to_string())
        .opt("-t", span.duration_arg())
        .arg("-accurate_seek")
        .opt("-i", input.to_string_lossy())
        .opt("-c", "copy")
        .opt("-avoid_negative_ts", "1")
        .opt("-reset_timestamps", "1")
        .args(["-y", "-hide_banner"])
        .opt("-loglevel", "error")
        .opt("-map", "0")
        .arg(output.to_string_lossy())
}
