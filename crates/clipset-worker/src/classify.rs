//! Failure taxonomy and classification of raw tool output.
//!
//! The download tools only report failures as unstructured text. This
//! module is the single place that maps that text onto [`ErrorKind`].

use std::fmt;

/// Markers that indicate the remote host is throttling us.
const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "too many requests"];

/// Markers that indicate the request was refused outright.
const ACCESS_DENIED_MARKERS: &[&str] = &["403", "forbidden"];

/// Classified failure of one piece of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Remote host is throttling. Back off, then retry.
    RateLimited,
    /// Request refused. Retrying the same strategy will not help.
    AccessDenied,
    /// Tool exceeded its wall-clock budget and was killed.
    TimeoutExceeded,
    /// Non-zero exit, or missing or undersized output.
    ToolInvocationFailed,
    /// Manifest row could not be parsed.
    ParseError,
    /// Cut stage source video is absent.
    SourceMissing,
    /// Worker task panicked.
    UnexpectedWorkerCrash,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::TimeoutExceeded => "timeout_exceeded",
            ErrorKind::ToolInvocationFailed => "tool_invocation_failed",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::SourceMissing => "source_missing",
            ErrorKind::UnexpectedWorkerCrash => "unexpected_worker_crash",
        }
    }

    /// Whether the remaining attempts of the current strategy should be
    /// abandoned in favour of the next strategy.
    pub fn abandons_strategy(&self) -> bool {
        matches!(self, ErrorKind::AccessDenied | ErrorKind::TimeoutExceeded)
    }

    /// Whether an extended backoff is due before the next attempt.
    pub fn needs_backoff(&self) -> bool {
        matches!(self, ErrorKind::RateLimited)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the captured output of a failed tool invocation.
///
/// Matching is case-insensitive. Rate-limit markers win over access-denied
/// markers when both appear.
pub fn classify_output(text: &str) -> ErrorKind {
    let lower = text.to_lowercase();

    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorKind::RateLimited
    } else if ACCESS_DENIED_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorKind::AccessDenied
    } else {
        ErrorKind::ToolInvocationFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_markers() {
        assert_eq!(
            classify_output("ERROR: HTTP Error 429: Too Many Requests"),
            ErrorKind::RateLimited
        );
        assert_eq!(classify_output("Rate Limit exceeded"), ErrorKind::RateLimited);
        assert_eq!(classify_output("TOO MANY REQUESTS"), ErrorKind::RateLimited);
    }

    #[test]
    fn test_access_denied_markers() {
        assert_eq!(
            classify_output("ERROR: unable to download video data: HTTP Error 403: Forbidden"),
            ErrorKind::AccessDenied
        );
        assert_eq!(classify_output("FORBIDDEN"), ErrorKind::AccessDenied);
    }

    #[test]
    fn test_rate_limit_takes_precedence() {
        assert_eq!(classify_output("403 then 429"), ErrorKind::RateLimited);
    }

    #[test]
    fn test_generic_failure() {
        assert_eq!(
            classify_output("ERROR: Video unavailable"),
            ErrorKind::ToolInvocationFailed
        );
        assert_eq!(classify_output(""), ErrorKind::ToolInvocationFailed);
    }

    #[test]
    fn test_strategy_policy() {
        assert!(ErrorKind::AccessDenied.abandons_strategy());
        assert!(ErrorKind::TimeoutExceeded.abandons_strategy());
        assert!(!ErrorKind::RateLimited.abandons_strategy());
        assert!(!ErrorKind::ToolInvocationFailed.abandons_strategy());
        assert!(ErrorKind::RateLimited.needs_backoff());
        assert_eq!(ErrorKind::UnexpectedWorkerCrash.to_string(), "unexpected_worker_crash");
    }
}
