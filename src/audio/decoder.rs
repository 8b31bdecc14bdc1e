// Audio decoder using Symphonia
// Decodes audio files to interleaved f32 samples behind a closable, position-tracking stream

use parking_lot::Mutex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use super::format::{AudioFormat, StreamFormat};
use crate::error::{PlayerError, Result};

/// Precision reported for lossy codecs that don't carry one
const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

struct DecoderState {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

struct StreamShared {
    path: PathBuf,
    state: Mutex<Option<DecoderState>>,
    /// Frames handed to the output so far
    position: AtomicU64,
}

/// Exclusively owned cursor into a decoded track.
///
/// The position only moves forward. `close` releases the decoder and runs at
/// most once; dropping the stream closes it.
pub struct DecodeStream {
    shared: Arc<StreamShared>,
}

impl DecodeStream {
    /// Open `path` and prepare the decoder that belongs to `kind`
    pub fn open(path: &Path, kind: AudioFormat) -> Result<(Self, StreamFormat)> {
        let file = File::open(path).map_err(|source| PlayerError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(kind.extension());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| PlayerError::decode(path, format!("failed to detect file format: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| PlayerError::decode(path, "no audio track found"))?;

        if !kind.accepts(track.codec_params.codec) {
            return Err(PlayerError::decode(
                path,
                format!("contents are not {} audio", kind.label()),
            ));
        }

        let params = &track.codec_params;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| PlayerError::decode(path, "sample rate is unknown"))?;
        let channels = params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| PlayerError::decode(path, "channel layout is unknown"))?;
        let bits_per_sample = params
            .bits_per_sample
            .or(params.bits_per_coded_sample)
            .unwrap_or(DEFAULT_BITS_PER_SAMPLE);
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| PlayerError::decode(path, format!("failed to create decoder: {}", e)))?;

        tracing::debug!(
            path = %path.display(),
            %kind,
            sample_rate,
            channels,
            bits_per_sample,
            "opened decode stream"
        );

        let stream = Self {
            shared: Arc::new(StreamShared {
                path: path.to_path_buf(),
                state: Mutex::new(Some(DecoderState {
                    format,
                    decoder,
                    track_id,
                })),
                position: AtomicU64::new(0),
            }),
        };

        Ok((
            stream,
            StreamFormat {
                sample_rate,
                bits_per_sample,
                channels,
            },
        ))
    }

    /// Frames consumed so far
    pub fn position(&self) -> u64 {
        self.shared.position.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().is_none()
    }

    /// Release the decoder. Later calls do nothing.
    pub fn close(&self) {
        if self.shared.state.lock().take().is_some() {
            tracing::debug!(path = %self.shared.path.display(), "closed decode stream");
        }
    }

    /// Reading end handed to the sink's playback activity
    pub(crate) fn reader(&self) -> StreamReader {
        StreamReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for DecodeStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reading side of a [`DecodeStream`], used off the owner's thread
pub(crate) struct StreamReader {
    shared: Arc<StreamShared>,
}

impl StreamReader {
    /// Decode the next packet into interleaved f32 samples.
    /// Returns None at end of stream or once the owner has closed the stream.
    pub fn next_chunk(&self) -> Result<Option<Vec<f32>>> {
        let mut guard = self.shared.state.lock();
        let Some(state) = guard.as_mut() else {
            return Ok(None);
        };

        loop {
            let packet = match state.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    state.decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(PlayerError::decode(
                        &self.shared.path,
                        format!("failed to read packet: {}", e),
                    ))
                }
            };

            if packet.track_id() != state.track_id {
                continue;
            }

            match state.decoder.decode(&packet) {
                // Lapped codecs (Vorbis) emit nothing for their first packet
                Ok(decoded) if decoded.frames() == 0 => continue,
                Ok(decoded) => return Ok(Some(to_interleaved_f32(&decoded))),
                Err(SymphoniaError::DecodeError(e)) => {
                    // A single corrupt packet is skipped
                    tracing::warn!(path = %self.shared.path.display(), "decode error (skipping): {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(PlayerError::decode(
                        &self.shared.path,
                        format!("decode failed: {}", e),
                    ))
                }
            }
        }
    }

    /// Move the position forward by `frames`
    pub fn advance(&self, frames: u64) {
        self.shared.position.fetch_add(frames, Ordering::AcqRel);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().is_none()
    }
}

fn to_interleaved_f32(buf: &AudioBufferRef) -> Vec<f32> {
    match buf {
        AudioBufferRef::F32(b) => interleave(&**b),
        AudioBufferRef::F64(b) => interleave(&**b),
        AudioBufferRef::S8(b) => interleave(&**b),
        AudioBufferRef::S16(b) => interleave(&**b),
        AudioBufferRef::S24(b) => interleave(&**b),
        AudioBufferRef::S32(b) => interleave(&**b),
        AudioBufferRef::U8(b) => interleave(&**b),
        AudioBufferRef::U16(b) => interleave(&**b),
        AudioBufferRef::U24(b) => interleave(&**b),
        AudioBufferRef::U32(b) => interleave(&**b),
    }
}

fn interleave<S: Sample + IntoSample<f32>>(buf: &AudioBuffer<S>) -> Vec<f32> {
    let planes = buf.planes();
    let planes = planes.planes();
    let frames = buf.frames();
    if planes.is_empty() || frames == 0 {
        return vec![];
    }

    let mut interleaved = Vec::with_capacity(frames * planes.len());
    for frame in 0..frames {
        for plane in planes {
            interleaved.push(plane[frame].into_sample());
        }
    }
    interleaved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_wav;

    #[test]
    fn test_reads_all_frames_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "tone.wav", 8_000, 2, 3_000);
        let (stream, _) = DecodeStream::open(&path, AudioFormat::Wav).unwrap();
        let reader = stream.reader();

        let mut samples = 0;
        while let Some(chunk) = reader.next_chunk().unwrap() {
            samples += chunk.len();
        }
        assert_eq!(samples, 3_000 * 2);
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_samples_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "tone.wav", 8_000, 1, 800);
        let (stream, _) = DecodeStream::open(&path, AudioFormat::Wav).unwrap();

        let chunk = stream.reader().next_chunk().unwrap().unwrap();
        assert!(chunk.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(chunk.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_position_only_moves_forward() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "tone.wav", 8_000, 1, 100);
        let (stream, _) = DecodeStream::open(&path, AudioFormat::Wav).unwrap();
        let reader = stream.reader();

        reader.advance(40);
        reader.advance(0);
        reader.advance(60);
        assert_eq!(stream.position(), 100);
    }

    #[test]
    fn test_close_is_idempotent_and_stops_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "tone.wav", 8_000, 1, 100);
        let (stream, _) = DecodeStream::open(&path, AudioFormat::Wav).unwrap();
        let reader = stream.reader();

        stream.close();
        stream.close();
        assert!(stream.is_closed());
        assert!(reader.is_closed());
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_drop_closes_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "tone.wav", 8_000, 1, 100);
        let (stream, _) = DecodeStream::open(&path, AudioFormat::Wav).unwrap();
        let reader = stream.reader();

        drop(stream);
        assert!(reader.is_closed());
    }
}
