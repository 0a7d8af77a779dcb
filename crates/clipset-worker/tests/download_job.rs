mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clipset_media::{partial_artifacts, MediaError, ToolRunner};
use clipset_models::{DownloadItem, Outcome, OutcomeKind};
use clipset_worker::{
    run_download_job, DownloadConfig, DownloadContext, DownloadStrategy, RetryPolicy,
};
use tempfile::TempDir;

use common::*;

fn context(runner: Arc<FakeRunner>, retries: u32) -> DownloadContext {
    let runner: Arc<dyn ToolRunner> = runner;
    DownloadContext::new(&DownloadConfig::default(), None, runner)
        .with_policy(RetryPolicy::with_retries(retries).without_delays())
}

/// Context with the stock delays: 2-5s throttle, 30-60s rate-limit backoff.
fn default_context(runner: Arc<FakeRunner>) -> DownloadContext {
    let runner: Arc<dyn ToolRunner> = runner;
    DownloadContext::new(&DownloadConfig::default(), None, runner)
}

fn item(dir: &TempDir, id: &str) -> DownloadItem {
    DownloadItem::new(
        id,
        format!("https://www.youtube.com/watch?v={}", id),
        dir.path().join("download").join(format!("{}.mp4", id)),
    )
}

fn failure_text(outcome: &Outcome) -> &str {
    match outcome {
        Outcome::Failure(record) => &record.error,
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_complete_file_is_skipped_without_invoking_tool() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "done");
    write_file(&item.output_path, GOOD_VIDEO_SIZE);

    let runner = FakeRunner::unreachable();
    let outcome = run_download_job(&context(runner.clone(), 2), &item).await;

    assert_eq!(outcome.kind(), OutcomeKind::Skipped);
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn test_undersized_file_is_replaced() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "short");
    write_file(&item.output_path, 100);

    let saw_leftover = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&saw_leftover);
    let runner = FakeRunner::new(move |cmd, _| {
        if download_target(cmd).exists() {
            flag.store(true, Ordering::SeqCst);
        }
        download_ok(cmd)
    });

    let outcome = run_download_job(&context(runner.clone(), 2), &item).await;

    assert_eq!(outcome.kind(), OutcomeKind::Success);
    assert_eq!(runner.calls(), 1);
    assert!(!saw_leftover.load(Ordering::SeqCst));
    assert_eq!(
        std::fs::metadata(&item.output_path).unwrap().len(),
        GOOD_VIDEO_SIZE as u64
    );
}

#[tokio::test]
async fn test_partial_artifacts_removed_before_attempt() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "partial");
    for artifact in partial_artifacts(&item.output_path) {
        write_file(&artifact, 10);
    }

    let stale_seen = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stale_seen);
    let runner = FakeRunner::new(move |cmd, _| {
        if partial_artifacts(&download_target(cmd)).iter().any(|p| p.exists()) {
            flag.store(true, Ordering::SeqCst);
        }
        download_ok(cmd)
    });

    let outcome = run_download_job(&context(runner, 0), &item).await;
    assert_eq!(outcome.kind(), OutcomeKind::Success);
    assert!(!stale_seen.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_rate_limited_attempt_is_retried() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "limited");

    let runner = FakeRunner::new(|cmd, n| {
        if n == 0 {
            exited(1, "ERROR: HTTP Error 429: Too Many Requests")
        } else {
            download_ok(cmd)
        }
    });

    let outcome = run_download_job(&context(runner.clone(), 2), &item).await;
    assert_eq!(outcome.kind(), OutcomeKind::Success);
    assert_eq!(runner.calls(), 2);
}

#[tokio::test]
async fn test_forbidden_advances_to_next_strategy() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "denied");

    let runner = FakeRunner::new(|_, _| exited(1, "ERROR: HTTP Error 403: Forbidden"));
    let ctx = context(runner.clone(), 2).with_strategies(vec![
        DownloadStrategy::standard(),
        DownloadStrategy::new("low-quality").with_format("best[height<=360]"),
    ]);

    let outcome = run_download_job(&ctx, &item).await;

    // One attempt per strategy: 403 abandons the rest of each budget.
    assert_eq!(runner.calls(), 2);
    let commands = runner.commands();
    assert_eq!(commands[0].value_of("-f"), Some("best[height<=720]/best"));
    assert_eq!(commands[1].value_of("-f"), Some("best[height<=360]/best"));

    let error = failure_text(&outcome);
    assert!(error.starts_with("low-quality failed: "));
    assert!(error.contains("403"));
}

#[tokio::test]
async fn test_generic_failures_exhaust_retry_budget() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "broken");
    let noisy = "x".repeat(500);

    let stderr = noisy.clone();
    let runner = FakeRunner::new(move |_, _| exited(1, &stderr));

    let outcome = run_download_job(&context(runner.clone(), 2), &item).await;

    assert_eq!(runner.calls(), 3);
    let error = failure_text(&outcome);
    assert_eq!(error, format!("standard failed: {}", &noisy[..200]));
    assert!(!item.output_path.exists());
}

#[tokio::test]
async fn test_timeout_abandons_strategy() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "slow");

    let runner = FakeRunner::new(|_, _| Err(MediaError::timeout("yt-dlp", 600)));
    let outcome = run_download_job(&context(runner.clone(), 2), &item).await;

    assert_eq!(runner.calls(), 1);
    assert!(failure_text(&outcome).contains("timed out after 600s"));
}

#[tokio::test]
async fn test_zero_exit_without_output_is_failure() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "ghost");

    let runner = FakeRunner::new(|cmd, _| {
        write_file(&download_target(cmd), 512);
        ok()
    });
    let outcome = run_download_job(&context(runner.clone(), 0), &item).await;

    assert_eq!(runner.calls(), 1);
    assert!(failure_text(&outcome).contains("missing or undersized"));
}

#[tokio::test]
async fn test_each_attempt_carries_full_option_set() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "opts");

    let runner = FakeRunner::new(|cmd, n| if n < 2 { exited(1, "boom") } else { download_ok(cmd) });
    let outcome = run_download_job(&context(runner.clone(), 2), &item).await;
    assert_eq!(outcome.kind(), OutcomeKind::Success);

    for cmd in runner.commands() {
        assert_eq!(cmd.program(), "yt-dlp");
        assert!(cmd.value_of("--user-agent").is_some());
        assert_eq!(cmd.values_of("--add-header").count(), 6);
        assert_eq!(cmd.last_arg(), Some(item.source_url.as_str()));
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_is_throttled_within_delay_range() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "throttled");

    let runner = FakeRunner::new(|cmd, _| download_ok(cmd));
    let started = tokio::time::Instant::now();
    let outcome = run_download_job(&default_context(runner), &item).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.kind(), OutcomeKind::Success);
    assert!(elapsed >= Duration::from_secs(2), "slept {:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(5), "slept {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_backs_off_before_retry() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "backoff");

    let retried_at = Arc::new(std::sync::Mutex::new(None));
    let recorder = Arc::clone(&retried_at);
    let started = tokio::time::Instant::now();
    let runner = FakeRunner::new(move |cmd, n| {
        if n == 0 {
            return exited(1, "ERROR: HTTP Error 429: Too Many Requests");
        }
        *recorder.lock().unwrap() = Some(started.elapsed());
        download_ok(cmd)
    });

    let outcome = run_download_job(&default_context(runner.clone()), &item).await;
    assert_eq!(outcome.kind(), OutcomeKind::Success);
    assert_eq!(runner.calls(), 2);

    let backoff = retried_at.lock().unwrap().expect("second attempt ran");
    assert!(backoff >= Duration::from_secs(30), "backed off {:?}", backoff);
    assert!(backoff <= Duration::from_secs(60), "backed off {:?}", backoff);
}

#[tokio::test(start_paused = true)]
async fn test_generic_failure_retries_without_backoff() {
    let dir = TempDir::new().unwrap();
    let item = item(&dir, "flaky");

    let runner = FakeRunner::new(|_, _| exited(1, "ERROR: unable to extract"));
    let started = tokio::time::Instant::now();
    let outcome = run_download_job(&default_context(runner.clone()), &item).await;

    assert_eq!(outcome.kind(), OutcomeKind::Failure);
    assert_eq!(runner.calls(), 3);
    assert!(started.elapsed() < Duration::from_secs(1));
}
