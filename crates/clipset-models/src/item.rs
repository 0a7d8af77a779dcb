//! Download-stage work items.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of one unit of batch work.
///
/// The executor only needs the id and the source locator to report an
/// outcome for an item, including when the item's worker crashes.
pub trait BatchItem {
    /// Unique id of the item within its manifest.
    fn id(&self) -> &str;

    /// Where the item's source lives (usually a URL).
    fn locator(&self) -> &str;
}

/// One video to download.
///
/// Created once from a manifest row and never mutated; retries reuse the
/// same item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Manifest `videoID`
    pub id: String,
    /// Manifest `url`
    pub source_url: String,
    /// Final destination, `{output}/download/{id}.mp4`
    pub output_path: PathBuf,
}

impl DownloadItem {
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            output_path: output_path.into(),
        }
    }
}

impl BatchItem for DownloadItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn locator(&self) -> &str {
        &self.source_url
    }
}
