//! Shared data models for the clipset pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Download work items and cut manifests
//! - `HH:MM:SS.mmm` timestamps and exact span durations
//! - Quality presets
//! - Per-item outcomes and failure records

pub mod clip;
pub mod item;
pub mod outcome;
pub mod quality;
pub mod timestamp;

// Re-export common types
pub use clip::{clip_id, ClipSpan, SpanError, VideoManifestEntry};
pub use item::{BatchItem, DownloadItem};
pub use outcome::{FailureRecord, Outcome, OutcomeKind};
pub use quality::Quality;
pub use timestamp::{hhmmss, Timestamp, TimestampError};
