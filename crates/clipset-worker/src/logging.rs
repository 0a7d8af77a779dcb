//! Tracing setup and structured per-item logging.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::{error, info, warn, Span};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::error::{WorkerError, WorkerResult};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global tracing subscriber.
///
/// The log file, when given, receives the stream filtered by `RUST_LOG`.
/// The console gets the same stream unless a log file or a visible
/// progress bar is in use; then it only shows warnings, so log lines do
/// not tear the bar. Set `LOG_FORMAT=json` for JSON lines.
pub fn init_tracing(log_file: Option<&Path>, progress_visible: bool) -> WorkerResult<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true);
        layers.push(if use_json {
            file_layer.json().with_filter(env_filter()).boxed()
        } else {
            file_layer.with_filter(env_filter()).boxed()
        });
    }

    if quiet_console(log_file.is_some(), progress_visible) {
        layers.push(console_layer(use_json, LevelFilter::WARN));
    } else {
        layers.push(console_layer(use_json, env_filter()));
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| WorkerError::config_error(format!("Failed to initialise logging: {}", e)))
}

/// Whether the console is limited to warnings.
fn quiet_console(has_log_file: bool, progress_visible: bool) -> bool {
    has_log_file || progress_visible
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn console_layer<F>(use_json: bool, filter: F) -> BoxedLayer
where
    F: tracing_subscriber::layer::Filter<Registry> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if use_json {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_ansi(true).with_filter(filter).boxed()
    }
}

/// Item logger for structured logging with consistent fields.
///
/// Every event carries the item id and the stage (`download` or `cut`).
#[derive(Debug, Clone)]
pub struct JobLogger {
    item_id: String,
    stage: &'static str,
}

impl JobLogger {
    pub fn new(item_id: &str, stage: &'static str) -> Self {
        Self {
            item_id: item_id.to_string(),
            stage,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(item_id = %self.item_id, stage = self.stage, "Item started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(item_id = %self.item_id, stage = self.stage, "Item progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(item_id = %self.item_id, stage = self.stage, "Item warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(item_id = %self.item_id, stage = self.stage, "Item error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(item_id = %self.item_id, stage = self.stage, "Item completed: {}", message);
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Span carrying the item's fields, for instrumenting its future.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("item", item_id = %self.item_id, stage = self.stage)
    }
}
