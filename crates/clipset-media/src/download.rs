//! Video download command construction for yt-dlp.
//!
//! Builds the full anti-detection option set for one download attempt.
//! User-agent and request headers are re-drawn for every attempt so that
//! consecutive requests do not share a fingerprint.

use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use tracing::{debug, warn};

use crate::command::ToolCommand;

/// Program name of the downloader.
pub const YTDLP_PROGRAM: &str = "yt-dlp";

/// Referer sent with every request.
pub const DEFAULT_REFERER: &str = "https://www.youtube.com/";

/// Desktop browser user-agents to rotate through.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0",
];

/// `Accept-Language` values to rotate through.
pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.8,zh-CN;q=0.7",
    "en;q=0.9",
];

/// Minimum size for a valid cookies file (bytes).
/// A real Netscape cookies file is at least ~50 bytes.
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// Options passed through to yt-dlp for one attempt.
///
/// Treated as opaque configuration: nothing here is interpreted by the
/// batch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOptions {
    pub user_agent: String,
    pub referer: String,
    pub proxy: Option<String>,
    /// Ordered `(name, value)` pairs sent via `--add-header`.
    pub headers: Vec<(String, String)>,
    pub quality_selector: String,
    pub cookies_path: Option<PathBuf>,
    pub socket_timeout_secs: u32,
    pub retries: u32,
    pub fragment_retries: u32,
    pub retry_sleep: String,
    pub concurrent_fragments: u32,
    pub buffer_size: String,
    pub http_chunk_size: u64,
    pub throttle_rate: String,
}

impl ToolOptions {
    /// Fixed option set with a freshly drawn user-agent and header set.
    pub fn randomized(
        quality_selector: impl Into<String>,
        proxy: Option<String>,
        cookies_path: Option<PathBuf>,
    ) -> Self {
        Self {
            user_agent: random_user_agent().to_string(),
            referer: DEFAULT_REFERER.to_string(),
            proxy,
            headers: random_headers(),
            quality_selector: quality_selector.into(),
            cookies_path,
            socket_timeout_secs: 30,
            retries: 5,
            fragment_retries: 5,
            retry_sleep: "linear=1::2".to_string(),
            concurrent_fragments: 4,
            buffer_size: "16K".to_string(),
            http_chunk_size: 10 * 1024 * 1024,
            throttle_rate: "100K".to_string(),
        }
    }
}

/// Pick a user-agent uniformly at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Browser-like request headers with a random `Accept-Language`.
pub fn random_headers() -> Vec<(String, String)> {
    let language = ACCEPT_LANGUAGES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(ACCEPT_LANGUAGES[0]);

    [
        ("Accept-Language", language),
        ("Accept-Encoding", "gzip, deflate, br"),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("DNT", "1"),
        ("Connection", "keep-alive"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Build the yt-dlp command for one attempt.
///
/// `format_override` replaces the quality selector from `options`;
/// `extra_args` are appended before the output/URL arguments.
pub fn build_download_command(
    url: &str,
    output_path: &Path,
    options: &ToolOptions,
    format_override: Option<&str>,
    extra_args: &[String],
) -> ToolCommand {
    let mut cmd = ToolCommand::new(YTDLP_PROGRAM)
        .args(["--no-playlist", "--no-warnings"])
        .opt("--user-agent", &options.user_agent)
        .opt("--referer", &options.referer)
        .opt("--socket-timeout", options.socket_timeout_secs.to_string())
        .opt("--retries", options.retries.to_string())
        .opt("--fragment-retries", options.fragment_retries.to_string())
        .opt("--retry-sleep", &options.retry_sleep)
        .opt("--concurrent-fragments", options.concurrent_fragments.to_string())
        .opt("--buffer-size", &options.buffer_size)
        .opt("--http-chunk-size", options.http_chunk_size.to_string())
        .args([
            "--no-check-certificate",
            "--prefer-insecure",
            "--geo-bypass",
            "--no-call-home",
            "--ignore-errors",
            "--no-abort-on-error",
        ])
        .opt("--throttled-rate", &options.throttle_rate);

    for (name, value) in &options.headers {
        cmd = cmd.opt("--add-header", format!("{}:{}", name, value));
    }

    let selector = format_override.unwrap_or(options.quality_selector.as_str());
    cmd = cmd.opt("-f", format!("{}/best", selector));

    if let Some(proxy) = &options.proxy {
        cmd = cmd.opt("--proxy", proxy);
    }

    if let Some(cookies) = &options.cookies_path {
        cmd = cmd.opt("--cookies", cookies.to_string_lossy());
    }

    cmd.args(extra_args.iter().cloned())
        .opt("-o", output_path.to_string_lossy())
        .arg(url)
}

/// Validate that a cookies file appears to be in Netscape format.
///
/// Netscape cookies files either start with "# Netscape HTTP Cookie File"
/// or contain tab-separated lines with domain entries.
pub fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File")
        || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.split('\t').count() >= 6)
}

/// Return `path` if it is a usable cookies file.
///
/// Returns `None` (with a warning) if the file is missing, too small, or
/// not in Netscape format.
pub fn usable_cookies_path(path: &Path) -> Option<PathBuf> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            warn!("Cookies file {} not usable: {}", path.display(), e);
            return None;
        }
    };

    if metadata.len() < MIN_COOKIES_FILE_SIZE {
        warn!(
            "Cookies file {} is too small ({} bytes), skipping",
            path.display(),
            metadata.len()
        );
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(content) if is_valid_netscape_cookies(&content) => {
            debug!("Using cookies file {}", path.display());
            Some(path.to_path_buf())
        }
        Ok(_) => {
            warn!(
                "Cookies file {} is not in Netscape format, skipping",
                path.display()
            );
            None
        }
        Err(e) => {
            warn!("Failed to read cookies file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ToolOptions {
        ToolOptions::randomized("best[height<=720]", None, None)
    }

    #[test]
    fn test_randomized_options_use_known_values() {
        let opts = options();
        assert!(USER_AGENTS.contains(&opts.user_agent.as_str()));
        assert_eq!(opts.headers.len(), 6);
        assert_eq!(opts.headers[0].0, "Accept-Language");
        assert!(ACCEPT_LANGUAGES.contains(&opts.headers[0].1.as_str()));
    }

    #[test]
    fn test_build_download_command() {
        let opts = options();
        let cmd = build_download_command(
            "https://youtube.com/watch?v=abc",
            Path::new("/data/download/abc.mp4"),
            &opts,
            None,
            &[],
        );

        assert_eq!(cmd.program(), "yt-dlp");
        assert_eq!(cmd.value_of("-f"), Some("best[height<=720]/best"));
        assert_eq!(cmd.value_of("-o"), Some("/data/download/abc.mp4"));
        assert_eq!(cmd.value_of("--throttled-rate"), Some("100K"));
        assert_eq!(cmd.value_of("--http-chunk-size"), Some("10485760"));
        assert_eq!(cmd.value_of("--proxy"), None);
        assert_eq!(cmd.values_of("--add-header").count(), 6);
        assert!(cmd.arguments().iter().any(|a| a == "--geo-bypass"));
        assert_eq!(cmd.last_arg(), Some("https://youtube.com/watch?v=abc"));
    }

    #[test]
    fn test_build_download_command_with_overrides() {
        let mut opts = options();
        opts.proxy = Some("socks5://127.0.0.1:1080".to_string());
        opts.cookies_path = Some(PathBuf::from("/secrets/cookies.txt"));

        let cmd = build_download_command(
            "https://youtu.be/abc",
            Path::new("abc.mp4"),
            &opts,
            Some("best[height<=360]"),
            &["--force-ipv4".to_string()],
        );

        assert_eq!(cmd.value_of("-f"), Some("best[height<=360]/best"));
        assert_eq!(cmd.value_of("--proxy"), Some("socks5://127.0.0.1:1080"));
        assert_eq!(cmd.value_of("--cookies"), Some("/secrets/cookies.txt"));
        assert!(cmd.arguments().iter().any(|a| a == "--force-ipv4"));
    }

    #[test]
    fn test_netscape_cookie_detection() {
        assert!(is_valid_netscape_cookies("# Netscape HTTP Cookie File\n"));
        assert!(is_valid_netscape_cookies(
            ".youtube.com\tTRUE\t/\tTRUE\t0\tPREF\tf1=1"
        ));
        assert!(!is_valid_netscape_cookies("{\"cookies\": []}"));
    }

    #[test]
    fn test_usable_cookies_path() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = dir.path().join("missing.txt");
        assert_eq!(usable_cookies_path(&missing), None);

        let good = dir.path().join("cookies.txt");
        std::fs::write(
            &good,
            "# Netscape HTTP Cookie File\n.youtube.com\tTRUE\t/\tTRUE\t0\tPREF\tf1=1\n",
        )
        .unwrap();
        assert_eq!(usable_cookies_path(&good), Some(good.clone()));

        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, "x".repeat(100)).unwrap();
        assert_eq!(usable_cookies_path(&bad), None);
    }
}
