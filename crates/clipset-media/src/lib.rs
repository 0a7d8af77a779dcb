//! yt-dlp and FFmpeg subprocess wrappers.
//!
//! This crate provides:
//! - A timeout-bounded external tool runner that kills the whole process group on expiry
//! - yt-dlp command construction with randomized user-agents and headers
//! - FFmpeg stream-copy clip cutting commands
//! - Filesystem helpers for idempotency checks and stale artifact cleanup

pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;

pub use clip::{build_cut_command, FFMPEG_PROGRAM};
pub use command::{
    check_ffmpeg, check_ytdlp, truncate_chars, InvocationResult, ProcessRunner, ToolCommand,
    ToolRunner, ERROR_EXCERPT_CHARS,
};
pub use download::{
    build_download_command, is_valid_netscape_cookies, usable_cookies_path, ToolOptions,
    YTDLP_PROGRAM,
};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{
    file_size, is_complete_file, partial_artifacts, remove_if_exists, remove_partial_artifacts,
    MIN_VALID_FILE_SIZE,
};
