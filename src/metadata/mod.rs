// Track metadata for the status screen

pub mod extractor;

pub use extractor::MetadataExtractor;

/// Display metadata for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub bitrate_kbps: Option<u32>,
}
