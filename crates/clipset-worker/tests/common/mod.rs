//! Shared fakes for worker integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clipset_media::{InvocationResult, MediaResult, ToolCommand, ToolRunner};

/// Size written for a "good" fake video, comfortably above the 10 KiB threshold.
pub const GOOD_VIDEO_SIZE: usize = 20 * 1024;

type Script = dyn Fn(&ToolCommand, usize) -> MediaResult<InvocationResult> + Send + Sync;

/// A [`ToolRunner`] driven by a closure instead of real processes.
///
/// The closure receives the command and the zero-based call number.
pub struct FakeRunner {
    script: Box<Script>,
    calls: AtomicUsize,
    commands: Mutex<Vec<ToolCommand>>,
}

impl FakeRunner {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&ToolCommand, usize) -> MediaResult<InvocationResult> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        })
    }

    /// A runner that fails the test if it is ever invoked.
    pub fn unreachable() -> Arc<Self> {
        Self::new(|cmd, _| panic!("tool should not have been invoked: {}", cmd))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn invoke(
        &self,
        command: &ToolCommand,
        _timeout: Duration,
    ) -> MediaResult<InvocationResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push(command.clone());
        (self.script)(command, n)
    }
}

pub fn exited(code: i32, stderr: &str) -> MediaResult<InvocationResult> {
    Ok(InvocationResult {
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

pub fn ok() -> MediaResult<InvocationResult> {
    exited(0, "")
}

pub fn write_file(path: &Path, size: usize) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, vec![0u8; size]).unwrap();
}

/// Destination of a yt-dlp command.
pub fn download_target(cmd: &ToolCommand) -> PathBuf {
    PathBuf::from(cmd.value_of("-o").expect("yt-dlp command has -o"))
}

/// Destination of an ffmpeg command.
pub fn cut_target(cmd: &ToolCommand) -> PathBuf {
    PathBuf::from(cmd.last_arg().expect("ffmpeg command has an output"))
}

/// Simulates a successful yt-dlp run.
pub fn download_ok(cmd: &ToolCommand) -> MediaResult<InvocationResult> {
    write_file(&download_target(cmd), GOOD_VIDEO_SIZE);
    ok()
}

/// Simulates a successful ffmpeg run.
pub fn cut_ok(cmd: &ToolCommand) -> MediaResult<InvocationResult> {
    write_file(&cut_target(cmd), 1024);
    ok()
}
