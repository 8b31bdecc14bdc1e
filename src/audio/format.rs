// Extension-based format dispatch
// Maps the four supported extensions to a decoder; anything else is rejected

use std::fmt;
use std::path::Path;

use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_FLAC, CODEC_TYPE_MP3, CODEC_TYPE_PCM_ALAW, CODEC_TYPE_PCM_F32BE,
    CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_MULAW,
    CODEC_TYPE_PCM_S16BE, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S24BE, CODEC_TYPE_PCM_S24LE,
    CODEC_TYPE_PCM_S32BE, CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_S8, CODEC_TYPE_PCM_U16BE,
    CODEC_TYPE_PCM_U16LE, CODEC_TYPE_PCM_U24BE, CODEC_TYPE_PCM_U24LE, CODEC_TYPE_PCM_U32BE,
    CODEC_TYPE_PCM_U32LE, CODEC_TYPE_PCM_U8, CODEC_TYPE_VORBIS,
};

use super::decoder::DecodeStream;
use crate::error::{PlayerError, Result};

const PCM_CODECS: &[CodecType] = &[
    CODEC_TYPE_PCM_S8,
    CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S16BE,
    CODEC_TYPE_PCM_S24LE,
    CODEC_TYPE_PCM_S24BE,
    CODEC_TYPE_PCM_S32LE,
    CODEC_TYPE_PCM_S32BE,
    CODEC_TYPE_PCM_U8,
    CODEC_TYPE_PCM_U16LE,
    CODEC_TYPE_PCM_U16BE,
    CODEC_TYPE_PCM_U24LE,
    CODEC_TYPE_PCM_U24BE,
    CODEC_TYPE_PCM_U32LE,
    CODEC_TYPE_PCM_U32BE,
    CODEC_TYPE_PCM_F32LE,
    CODEC_TYPE_PCM_F32BE,
    CODEC_TYPE_PCM_F64LE,
    CODEC_TYPE_PCM_F64BE,
    CODEC_TYPE_PCM_ALAW,
    CODEC_TYPE_PCM_MULAW,
];

/// The supported container/codec pairs, keyed by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Ogg,
    Wav,
}

impl AudioFormat {
    /// Look up the format for a path. Matching is case-sensitive.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "mp3" => Ok(AudioFormat::Mp3),
            "flac" => Ok(AudioFormat::Flac),
            "ogg" => Ok(AudioFormat::Ogg),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(PlayerError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: if other.is_empty() {
                    String::new()
                } else {
                    format!(".{}", other)
                },
            }),
        }
    }

    /// Extension without the leading dot, used as the format hint
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
        }
    }

    /// Short label shown on the status screen
    pub fn label(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Flac => "FLAC",
            AudioFormat::Ogg => "OGG",
            AudioFormat::Wav => "WAV",
        }
    }

    /// Whether a track with this codec belongs to this format
    pub fn accepts(self, codec: CodecType) -> bool {
        match self {
            AudioFormat::Mp3 => codec == CODEC_TYPE_MP3,
            AudioFormat::Flac => codec == CODEC_TYPE_FLAC,
            AudioFormat::Ogg => codec == CODEC_TYPE_VORBIS,
            AudioFormat::Wav => PCM_CODECS.contains(&codec),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable description of a decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub channels: u16,
}

/// Dispatch on the extension and open a decoder for `path`.
pub fn decode(path: &Path) -> Result<(DecodeStream, StreamFormat)> {
    let kind = AudioFormat::from_path(path)?;
    DecodeStream::open(path, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, write_wav};

    #[test]
    fn test_supported_extensions() {
        assert_eq!(AudioFormat::from_path(Path::new("a.mp3")).unwrap(), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("a.flac")).unwrap(), AudioFormat::Flac);
        assert_eq!(AudioFormat::from_path(Path::new("dir/a.ogg")).unwrap(), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_path(Path::new("a.b.wav")).unwrap(), AudioFormat::Wav);
    }

    #[test]
    fn test_other_extensions_are_rejected() {
        for name in ["a.MP3", "a.Wav", "a.m4a", "a.txt", "noextension", "a.mp3.bak"] {
            match AudioFormat::from_path(Path::new(name)) {
                Err(PlayerError::UnsupportedFormat { .. }) => {}
                other => panic!("{} dispatched to {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_unsupported_extension_checked_before_open() {
        // The file doesn't exist; the extension decides first.
        match decode(Path::new("/nonexistent/track.aiff")) {
            Err(PlayerError::UnsupportedFormat { extension, .. }) => assert_eq!(extension, ".aiff"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_missing_file_is_open_error() {
        assert!(matches!(
            decode(Path::new("/nonexistent/track.flac")),
            Err(PlayerError::FileOpen { .. })
        ));
    }

    #[test]
    fn test_wav_decodes_with_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "tone.wav", 22_050, 2, 1_000);

        let (stream, format) = decode(&path).unwrap();
        assert_eq!(format.sample_rate, 22_050);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(stream.position(), 0);
    }

    /// Decode a checked-in file and pull the first block of audio out of it
    fn decode_fixture(name: &str) -> (StreamFormat, Vec<f32>) {
        let (stream, format) = decode(&fixture(name)).unwrap();
        let chunk = stream.reader().next_chunk().unwrap().expect("no audio decoded");
        (format, chunk)
    }

    #[test]
    fn test_flac_decodes_with_format() {
        let (format, chunk) = decode_fixture("tone.flac");
        assert_eq!(format.sample_rate, 48_000);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(chunk.len(), 576 * 2);
        assert!(chunk.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_mp3_decodes_with_format() {
        let (format, chunk) = decode_fixture("tone.mp3");
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.channels, 1);
        // MP3 carries no sample precision
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(chunk.len(), 1_152);
    }

    #[test]
    fn test_ogg_vorbis_decodes_with_format() {
        let (format, chunk) = decode_fixture("tone.ogg");
        assert_eq!(format.sample_rate, 22_050);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 16);
        assert!(!chunk.is_empty());
        assert_eq!(chunk.len() % 2, 0);
    }

    #[test]
    fn test_each_format_reads_to_the_end() {
        for name in ["tone.flac", "tone.mp3", "tone.ogg", "tone.wav"] {
            let dir = tempfile::tempdir().unwrap();
            let path = if name.ends_with(".wav") {
                write_wav(dir.path(), name, 8_000, 1, 800)
            } else {
                fixture(name)
            };
            let (stream, format) = decode(&path).unwrap();
            let reader = stream.reader();

            let mut frames = 0u64;
            while let Some(chunk) = reader.next_chunk().unwrap() {
                frames += chunk.len() as u64 / format.channels as u64;
            }
            assert!(frames > 0, "{} produced no audio", name);
        }
    }

    #[test]
    fn test_flac_payload_under_ogg_name_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let disguised = dir.path().join("tone.ogg");
        std::fs::copy(fixture("tone.flac"), &disguised).unwrap();

        assert!(matches!(decode(&disguised), Err(PlayerError::Decode { .. })));
    }

    #[test]
    fn test_mismatched_payload_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let wav = write_wav(dir.path(), "tone.wav", 44_100, 1, 100);
        let disguised = dir.path().join("tone.flac");
        std::fs::copy(&wav, &disguised).unwrap();

        assert!(matches!(decode(&disguised), Err(PlayerError::Decode { .. })));
    }

    #[test]
    fn test_wav_accepts_only_pcm() {
        assert!(AudioFormat::Wav.accepts(CODEC_TYPE_PCM_S16LE));
        assert!(!AudioFormat::Wav.accepts(CODEC_TYPE_MP3));
        assert!(!AudioFormat::Ogg.accepts(CODEC_TYPE_FLAC));
    }
}
