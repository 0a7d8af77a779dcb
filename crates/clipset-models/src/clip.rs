//! Clip spans and per-video cut manifests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::BatchItem;
use crate::timestamp::{format_duration_millis, Timestamp};

/// Span validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("Clip {clip_id} has non-positive duration ({start} -> {end})")]
    NonPositiveDuration {
        clip_id: String,
        start: Timestamp,
        end: Timestamp,
    },
}

/// One `[start, end]` range to cut out of a source video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipSpan {
    /// `{video_id}_{index:03}`
    pub clip_id: String,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ClipSpan {
    pub fn new(clip_id: impl Into<String>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            clip_id: clip_id.into(),
            start,
            end,
        }
    }

    /// Duration in milliseconds (negative if the span is inverted).
    pub fn duration_millis(&self) -> i64 {
        self.start.millis_until(&self.end)
    }

    /// Duration in seconds, formatted for the cutting tool.
    pub fn duration_arg(&self) -> String {
        format_duration_millis(self.duration_millis())
    }

    /// Reject spans whose end is not after their start.
    pub fn validate(&self) -> Result<(), SpanError> {
        if self.end <= self.start {
            return Err(SpanError::NonPositiveDuration {
                clip_id: self.clip_id.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Derive the id of the `index`-th clip of a video.
pub fn clip_id(video_id: &str, index: usize) -> String {
    format!("{}_{:03}", video_id, index)
}

/// Cut-stage work item: one source video and the clips to cut from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoManifestEntry {
    pub video_id: String,
    pub source_url: String,
    pub clips: Vec<ClipSpan>,
}

impl VideoManifestEntry {
    /// Build an entry from ordered `(start, end)` pairs, assigning clip ids
    /// in input order.
    pub fn from_spans(
        video_id: impl Into<String>,
        source_url: impl Into<String>,
        spans: impl IntoIterator<Item = (Timestamp, Timestamp)>,
    ) -> Self {
        let video_id = video_id.into();
        let clips = spans
            .into_iter()
            .enumerate()
            .map(|(idx, (start, end))| ClipSpan::new(clip_id(&video_id, idx), start, end))
            .collect();

        Self {
            video_id,
            source_url: source_url.into(),
            clips,
        }
    }
}

impl BatchItem for VideoManifestEntry {
    fn id(&self) -> &str {
        &self.video_id
    }

    fn locator(&self) -> &str {
        &self.source_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_clip_ids_follow_input_order() {
        let entry = VideoManifestEntry::from_spans(
            "abc",
            "https://youtube.com/watch?v=abc",
            vec![
                (ts("00:00:00.000"), ts("00:00:01.000")),
                (ts("00:00:05.000"), ts("00:00:09.000")),
                (ts("00:00:02.000"), ts("00:00:03.000")),
            ],
        );

        let ids: Vec<&str> = entry.clips.iter().map(|c| c.clip_id.as_str()).collect();
        assert_eq!(ids, vec!["abc_000", "abc_001", "abc_002"]);
        assert_eq!(entry.clips[1].start, ts("00:00:05.000"));
    }

    #[test]
    fn test_clip_id_padding() {
        assert_eq!(clip_id("v", 7), "v_007");
        assert_eq!(clip_id("v", 1234), "v_1234");
    }

    #[test]
    fn test_span_validation() {
        let ok = ClipSpan::new("a_000", ts("00:00:01.000"), ts("00:00:03.500"));
        assert!(ok.validate().is_ok());
        assert_eq!(ok.duration_arg(), "2.5");

        let empty = ClipSpan::new("a_001", ts("01:00:00.000"), ts("01:00:00.000"));
        assert!(matches!(
            empty.validate(),
            Err(SpanError::NonPositiveDuration { .. })
        ));

        let inverted = ClipSpan::new("a_002", ts("00:00:09.000"), ts("00:00:03.000"));
        assert!(inverted.validate().is_err());
    }
}
