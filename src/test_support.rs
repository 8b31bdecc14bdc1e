// Shared fixtures for unit tests

use std::path::{Path, PathBuf};

/// Write a 16-bit sine wave WAV of `frames` frames and return its path
pub fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, frames: u32) -> PathBuf {
    let path = dir.join(name);
    let wav_spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, wav_spec).unwrap();
    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let value = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// Small encoded files checked in under `testdata/`
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}
