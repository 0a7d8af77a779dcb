//! Concurrent batch engine for the clipset download and cut stages.
//!
//! This crate provides:
//! - Manifest loading and work partitioning
//! - Per-item download and cut workers with retry and backoff
//! - A bounded-concurrency batch executor with crash isolation
//! - Failure reports and cut result files
//! - Tracing setup and live progress

pub mod classify;
pub mod config;
pub mod cut_job;
pub mod download_job;
pub mod error;
pub mod executor;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod retry;

pub use classify::{classify_output, ErrorKind};
pub use config::{CutConfig, CutLayout, DownloadConfig};
pub use cut_job::{extract_clips, run_cut_job, CutContext};
pub use download_job::{default_strategies, run_download_job, DownloadContext, DownloadStrategy};
pub use error::{WorkerError, WorkerResult};
pub use executor::{BatchExecutor, RunSummary};
pub use logging::{init_tracing, JobLogger};
pub use pipeline::{run_cut_stage, run_download_stage, CutRun, DownloadRun};
pub use retry::{DelayRange, RetryPolicy};
