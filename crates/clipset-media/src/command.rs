//! External tool command builder and runner.
//!
//! Every tool invocation runs to completion under a hard wall-clock timeout.
//! On expiry the whole process group is killed, so helpers spawned by the
//! tool (ffmpeg children of yt-dlp, for example) do not outlive it. The
//! runner never retries; retry policy belongs to the caller, which is the
//! only layer that knows how to classify a failure.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// A program and its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a command for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a flag followed by its value.
    pub fn opt(self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Value following the first occurrence of `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }

    /// All values following each occurrence of `flag`.
    pub fn values_of<'a>(&'a self, flag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.args
            .windows(2)
            .filter(move |pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
    }

    /// Last argument, conventionally the output path or URL.
    pub fn last_arg(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Default length of error excerpts kept in failure messages.
pub const ERROR_EXCERPT_CHARS: usize = 200;

/// Exit status and captured output of a finished tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationResult {
    /// `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationResult {
    /// Returns true if the tool exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stderr, or stdout when stderr is empty.
    pub fn diagnostic_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// First `max_chars` characters of the diagnostic text.
    pub fn error_excerpt(&self, max_chars: usize) -> String {
        truncate_chars(self.diagnostic_text(), max_chars)
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Runs one external tool to completion.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `command`, capturing its output.
    ///
    /// Returns `MediaError::Timeout` if the process does not finish within
    /// `timeout`; the process and its descendants are killed first.
    async fn invoke(&self, command: &ToolCommand, timeout: Duration) -> MediaResult<InvocationResult>;
}

/// [`ToolRunner`] backed by real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn invoke(&self, command: &ToolCommand, timeout: Duration) -> MediaResult<InvocationResult> {
        debug!("Running {}", command);

        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| MediaError::Spawn {
            program: command.program().to_string(),
            source,
        })?;

        // Drain both pipes concurrently so a chatty tool cannot block on a full pipe.
        let stdout_task = tokio::spawn(read_lossy(child.stdout.take()));
        let stderr_task = tokio::spawn(read_lossy(child.stderr.take()));
        let readers = [stdout_task.abort_handle(), stderr_task.abort_handle()];
        let pid = child.id();

        // The budget covers the drain too: a descendant that inherited the
        // pipes keeps them open after the leader exits.
        let finished = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            let (stdout, stderr) = tokio::join!(stdout_task, stderr_task);
            Ok::<_, std::io::Error>((status, stdout.unwrap_or_default(), stderr.unwrap_or_default()))
        })
        .await;

        match finished {
            Ok(collected) => {
                let (status, stdout, stderr) = collected?;
                // Leftover group members must not outlive the invocation.
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                Ok(InvocationResult {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                })
            }
            Err(_) => {
                warn!(
                    program = command.program(),
                    timeout_secs = timeout.as_secs(),
                    "Tool timed out, killing process group"
                );
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                terminate(&mut child).await;
                for reader in &readers {
                    reader.abort();
                }
                Err(MediaError::timeout(command.program(), timeout.as_secs()))
            }
        }
    }
}

async fn read_lossy<R>(reader: Option<R>) -> String
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(&mut buf).await {
            debug!("Failed to read tool output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Kill the child itself and reap it.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Kill after timeout returned: {}", e);
        let _ = child.wait().await;
    }
}

#[cfg(unix)]
fn isolate_process_group(cmd: &mut Command) {
    // Child becomes leader of a new group whose id equals its pid.
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!(pid, "killpg failed: {}", e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if yt-dlp is available.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)
}
