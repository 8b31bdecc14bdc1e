// Sample conversion between the decoded stream layout and the device layout
// Channel remapping plus rubato resampling when the device can't run at the stream's rate

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::{PlayerError, Result};

/// Input frames per resampler call
const CHUNK_FRAMES: usize = 1024;

/// Map interleaved samples from `from` channels to `to` channels.
/// Output channel `c` takes input channel `c % from`, so mono is duplicated
/// and extra input channels are dropped.
pub fn remap_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            out.push(frame[ch % from]);
        }
    }
    out
}

/// Converts decoded chunks into device-ready interleaved samples
pub struct SampleConverter {
    in_channels: usize,
    out_channels: usize,
    resampler: Option<FastFixedIn<f32>>,
    /// Planar input waiting for a full resampler chunk
    pending: Vec<Vec<f32>>,
}

impl SampleConverter {
    pub fn new(in_rate: u32, out_rate: u32, in_channels: usize, out_channels: usize) -> Result<Self> {
        let resampler = if in_rate == out_rate || in_rate == 0 {
            None
        } else {
            let ratio = out_rate as f64 / in_rate as f64;
            let resampler = FastFixedIn::<f32>::new(
                ratio,
                1.0,
                PolynomialDegree::Linear,
                CHUNK_FRAMES,
                out_channels,
            )
            .map_err(|e| PlayerError::Output(format!("Failed to create resampler: {}", e)))?;
            tracing::debug!(in_rate, out_rate, "resampling to device rate");
            Some(resampler)
        };

        Ok(Self {
            in_channels,
            out_channels,
            resampler,
            pending: vec![Vec::new(); out_channels],
        })
    }

    /// Convert one decoded chunk. Resampled output may lag behind the input
    /// until a full chunk has accumulated.
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let remapped = remap_channels(samples, self.in_channels, self.out_channels);
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(remapped);
        };

        for frame in remapped.chunks_exact(self.out_channels) {
            for (ch, sample) in frame.iter().enumerate() {
                self.pending[ch].push(*sample);
            }
        }

        let mut out = Vec::new();
        while self.pending[0].len() >= resampler.input_frames_next() {
            let needed = resampler.input_frames_next();
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|plane| plane.drain(..needed).collect())
                .collect();
            let resampled = resampler
                .process(&chunk, None)
                .map_err(|e| PlayerError::Output(format!("Resampling failed: {}", e)))?;
            interleave_into(&resampled, &mut out);
        }
        Ok(out)
    }

    /// Flush whatever is still buffered at end of stream
    pub fn finish(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending[0].is_empty() {
            return Ok(Vec::new());
        }

        let chunk: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
        let resampled = resampler
            .process_partial(Some(chunk.as_slice()), None)
            .map_err(|e| PlayerError::Output(format!("Resampling failed: {}", e)))?;

        let mut out = Vec::new();
        interleave_into(&resampled, &mut out);
        Ok(out)
    }
}

fn interleave_into(planes: &[Vec<f32>], out: &mut Vec<f32>) {
    let frames = planes.first().map(|p| p.len()).unwrap_or(0);
    out.reserve(frames * planes.len());
    for frame in 0..frames {
        for plane in planes {
            out.push(plane[frame]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_to_stereo_duplicates() {
        assert_eq!(remap_channels(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_stereo_to_mono_keeps_left() {
        assert_eq!(remap_channels(&[0.1, 0.9, 0.2, 0.8], 2, 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_same_layout_passes_through() {
        let mut converter = SampleConverter::new(44_100, 44_100, 2, 2).unwrap();
        let input = vec![0.5, -0.5, 0.25, -0.25];
        assert_eq!(converter.process(&input).unwrap(), input);
        assert!(converter.finish().unwrap().is_empty());
    }

    #[test]
    fn test_resampling_changes_frame_count() {
        let mut converter = SampleConverter::new(24_000, 48_000, 1, 1).unwrap();
        let input: Vec<f32> = (0..4_800).map(|i| (i as f32 / 100.0).sin() * 0.5).collect();

        let mut out = converter.process(&input).unwrap();
        out.extend(converter.finish().unwrap());

        // Roughly double, give or take the resampler's edge handling
        assert!(out.len() > 8_000, "got {} samples", out.len());
        assert!(out.len() < 11_000, "got {} samples", out.len());
    }
}
