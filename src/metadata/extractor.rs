// Metadata extractor using lofty with id3 fallback for problematic MP3 files
use anyhow::Result;
use id3::TagLike;
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use std::path::Path;
use std::time::Duration;

use super::TrackInfo;
use crate::audio::format::AudioFormat;
use crate::error::PlayerError;

/// Tags and properties before the display policy is applied
#[derive(Debug, Default)]
struct RawTags {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration: Duration,
    audio_bitrate: Option<u32>,
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read the track's display metadata.
    ///
    /// `size_bytes` feeds the MP3 bitrate estimate. With `filename_fallback`
    /// an empty or missing title is replaced by the file name.
    pub fn read(
        file_path: &Path,
        kind: AudioFormat,
        size_bytes: u64,
        filename_fallback: bool,
    ) -> std::result::Result<TrackInfo, PlayerError> {
        let raw = Self::read_tags(file_path, kind).map_err(|e| PlayerError::MetadataRead {
            path: file_path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        let title = match raw.title.filter(|t| !t.trim().is_empty()) {
            Some(title) => title,
            None if filename_fallback => file_path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string(),
            None => String::new(),
        };

        let bitrate_kbps = match kind {
            AudioFormat::Mp3 => estimate_bitrate_kbps(size_bytes, raw.duration).or(raw.audio_bitrate),
            _ => raw.audio_bitrate,
        };

        Ok(TrackInfo {
            title,
            artist: raw.artist.filter(|s| !s.is_empty()),
            album: raw.album.filter(|s| !s.is_empty()),
            bitrate_kbps,
        })
    }

    fn read_tags(file_path: &Path, kind: AudioFormat) -> Result<RawTags> {
        // Try to read the file with lofty first
        let tagged_file = match Probe::open(file_path)?.guess_file_type()?.read() {
            Ok(f) => f,
            Err(e) if kind == AudioFormat::Mp3 => {
                tracing::warn!(path = %file_path.display(), "lofty failed ({}), trying id3", e);
                return Self::read_with_id3(file_path);
            }
            Err(e) => return Err(e.into()),
        };

        let tag = tagged_file.primary_tag().or(tagged_file.first_tag());
        let properties = tagged_file.properties();

        Ok(RawTags {
            title: tag.and_then(|t| t.title().map(|s| s.to_string())),
            artist: tag.and_then(|t| t.artist().map(|s| s.to_string())),
            album: tag.and_then(|t| t.album().map(|s| s.to_string())),
            duration: properties.duration(),
            audio_bitrate: properties.audio_bitrate(),
        })
    }

    /// The id3 crate is more lenient with malformed tags
    fn read_with_id3(file_path: &Path) -> Result<RawTags> {
        let tag = id3::Tag::read_from_path(file_path)?;

        Ok(RawTags {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            // TLEN, when present, is in milliseconds
            duration: tag
                .duration()
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or_default(),
            audio_bitrate: None,
        })
    }
}

/// File size over whole seconds of audio, in kbps
fn estimate_bitrate_kbps(size_bytes: u64, duration: Duration) -> Option<u32> {
    let seconds = duration.as_secs();
    if seconds == 0 {
        return None;
    }
    Some((size_bytes * 8 / seconds / 1000) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_wav;

    #[test]
    fn test_bitrate_estimate() {
        // 4 MB over 100 s
        assert_eq!(estimate_bitrate_kbps(4_000_000, Duration::from_secs(100)), Some(320));
        assert_eq!(estimate_bitrate_kbps(4_000_000, Duration::from_millis(900)), None);
    }

    #[test]
    fn test_untagged_wav_falls_back_to_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "untitled.wav", 8_000, 1, 8_000);

        let info = MetadataExtractor::read(&path, AudioFormat::Wav, 16_044, true).unwrap();
        assert_eq!(info.title, "untitled.wav");
        assert_eq!(info.artist, None);
        assert_eq!(info.album, None);
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "untitled.wav", 8_000, 1, 8_000);

        let info = MetadataExtractor::read(&path, AudioFormat::Wav, 16_044, false).unwrap();
        assert_eq!(info.title, "");
    }

    #[test]
    fn test_missing_file_is_metadata_error() {
        let result = MetadataExtractor::read(Path::new("/nonexistent/a.ogg"), AudioFormat::Ogg, 0, true);
        assert!(matches!(result, Err(PlayerError::MetadataRead { .. })));
    }
}
