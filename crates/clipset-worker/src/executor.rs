//! Batch executor.
//!
//! Runs one job per item with at most `workers` in flight. Each job runs in
//! its own spawned task holding a semaphore permit; outcomes come back over
//! a channel in completion order and are folded into a [`RunSummary`] by
//! the controller alone. A job that panics is reported as a failure for its
//! item and does not disturb any other item.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinError;
use tracing::{error, info, warn, Instrument};

use clipset_models::{BatchItem, FailureRecord, Outcome};

use crate::classify::ErrorKind;
use crate::logging::JobLogger;
use crate::progress::BatchProgress;

/// Aggregated result of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub total: usize,
    pub success_count: usize,
    pub skip_count: usize,
    pub failures: Vec<FailureRecord>,
    /// Artifacts reported by successful items, in arrival order.
    pub artifacts: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn new(total: usize, started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            total,
            success_count: 0,
            skip_count: 0,
            failures: Vec::new(),
            artifacts: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success { artifacts, .. } => {
                self.success_count += 1;
                self.artifacts.extend(artifacts);
            }
            Outcome::Skipped { .. } => self.skip_count += 1,
            Outcome::Failure(record) => self.failures.push(record),
        }
    }

    /// Number of items with a recorded outcome.
    pub fn accounted(&self) -> usize {
        self.success_count + self.skip_count + self.failures.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }
}

/// Bounded-concurrency runner for independent work items.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    workers: usize,
    label: &'static str,
    show_progress: bool,
}

impl BatchExecutor {
    /// Create an executor running at most `workers` jobs at once.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            label: "batch",
            show_progress: true,
        }
    }

    /// Stage name shown on the progress bar and attached to every item span.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` once for every item and collect every outcome.
    ///
    /// Always returns a summary that accounts for each item exactly once.
    pub async fn run<I, F, Fut>(&self, items: Vec<I>, job: F) -> RunSummary
    where
        I: BatchItem + Send + Sync + 'static,
        F: Fn(Arc<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let started_at = Local::now();
        let clock = Instant::now();
        let total = items.len();

        info!(
            "Starting {} run: {} items, {} workers",
            self.label, total, self.workers
        );

        let progress = BatchProgress::new(total, self.label, self.show_progress);
        let mut summary = RunSummary::new(total, started_at);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (tx, mut rx) = mpsc::channel::<Outcome>(self.workers);
        let job = Arc::new(job);
        let stage = self.label;

        let dispatcher = tokio::spawn(async move {
            for item in items {
                let item = Arc::new(item);
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        // The semaphore is never closed; still report the item.
                        let outcome = Outcome::failure(&*item, format!("not dispatched: {}", e));
                        let _ = tx.send(outcome).await;
                        continue;
                    }
                };

                let tx = tx.clone();
                let job = Arc::clone(&job);
                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = run_isolated(item, job, stage).await;
                    if tx.send(outcome).await.is_err() {
                        warn!("Outcome receiver dropped before the run finished");
                    }
                });
            }
        });

        while let Some(outcome) = rx.recv().await {
            progress.record(&outcome);
            summary.record(outcome);
        }

        if let Err(e) = dispatcher.await {
            error!("Dispatcher task failed: {}", e);
        }
        progress.finish();

        summary.elapsed = clock.elapsed();
        if summary.accounted() != total {
            error!(
                "Run accounted for {} of {} items",
                summary.accounted(),
                total
            );
        }

        info!(
            success = summary.success_count,
            skipped = summary.skip_count,
            failed = summary.failure_count(),
            total,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Finished {} run",
            self.label
        );
        summary
    }
}

/// Run `job` for `item` in a separate task so a panic is contained.
///
/// The job future runs inside the item's span, so every event it emits
/// carries the item id and stage.
async fn run_isolated<I, F, Fut>(item: Arc<I>, job: Arc<F>, stage: &'static str) -> Outcome
where
    I: BatchItem + Send + Sync + 'static,
    F: Fn(Arc<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    let span = JobLogger::new(item.id(), stage).create_span();
    let worker_item = Arc::clone(&item);
    let handle = tokio::spawn(async move { (*job)(worker_item).await }.instrument(span));

    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            let message = describe_join_error(e);
            error!(
                item_id = item.id(),
                kind = %ErrorKind::UnexpectedWorkerCrash,
                "Worker crashed: {}", message
            );
            Outcome::failure(&*item, format!("worker crashed: {}", message))
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => panic_message(&*payload),
        Err(err) => err.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
