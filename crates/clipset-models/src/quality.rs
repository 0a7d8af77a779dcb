//! Download quality presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Format selector used when the requested quality is not recognised.
pub const DEFAULT_FORMAT_SELECTOR: &str = "best[height<=720]";

/// Requested maximum video height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[serde(rename = "360")]
    P360,
    #[serde(rename = "480")]
    P480,
    #[default]
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "1080")]
    P1080,
    Best,
}

impl Quality {
    /// yt-dlp format selector for this quality.
    pub fn format_selector(&self) -> &'static str {
        match self {
            Quality::P360 => "best[height<=360]",
            Quality::P480 => "best[height<=480]",
            Quality::P720 => "best[height<=720]",
            Quality::P1080 => "best[height<=1080]",
            Quality::Best => "best",
        }
    }

    /// Selector for a free-form quality string, falling back to 720p.
    pub fn selector_for(value: &str) -> &'static str {
        value
            .parse::<Quality>()
            .map(|q| q.format_selector())
            .unwrap_or(DEFAULT_FORMAT_SELECTOR)
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "360" => Ok(Quality::P360),
            "480" => Ok(Quality::P480),
            "720" => Ok(Quality::P720),
            "1080" => Ok(Quality::P1080),
            "best" => Ok(Quality::Best),
            other => Err(format!(
                "unknown quality '{}', expected one of 360, 480, 720, 1080, best",
                other
            )),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quality::P360 => "360",
            Quality::P480 => "480",
            Quality::P720 => "720",
            Quality::P1080 => "1080",
            Quality::Best => "best",
        };
        f.write_str(s)
    }
}
