// Audio output using cpal
// Process-wide sink: one device binding per session, fed through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig, SupportedStreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::convert::SampleConverter;
use super::decoder::{DecodeStream, StreamReader};
use super::format::StreamFormat;
use crate::error::{PlayerError, Result};

/// Default sink buffer length
pub const DEFAULT_BUFFER: Duration = Duration::from_millis(100);

/// Set while a sink owns the output device
static SINK_ACTIVE: AtomicBool = AtomicBool::new(false);

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Pause/resume access to the output, guarded by the output lock.
pub trait Transport {
    /// Run `f` with the device pause flag while holding the output lock.
    /// The lock is released before this returns.
    fn with_pause_lock<R>(&self, f: impl FnOnce(&mut bool) -> R) -> R;
}

/// State read by the device callback on every buffer
struct Mixer {
    consumer: RingConsumer,
    paused: bool,
}

pub struct AudioSink {
    _stream: Stream,
    mixer: Arc<Mutex<Mixer>>,
    producer: Mutex<Option<RingProducer>>,
    sample_rate: u32,
    channels: u16,
    stop: Arc<AtomicBool>,
    feeder: Mutex<Option<JoinHandle<()>>>,
}

impl AudioSink {
    /// Bind the default output device for a stream at `sample_rate`.
    ///
    /// Only one sink may exist at a time; it is released when dropped.
    pub fn init(sample_rate: u32, buffer: Duration) -> Result<Self> {
        if SINK_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PlayerError::Output("Audio sink is already initialized".to_string()));
        }

        match Self::open(sample_rate, buffer) {
            Ok(sink) => Ok(sink),
            Err(e) => {
                SINK_ACTIVE.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    fn open(sample_rate: u32, buffer: Duration) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::Output("No output device available".to_string()))?;

        let config = Self::pick_config(&device, sample_rate)?;
        let device_rate = config.sample_rate().0;
        let channels = config.channels();

        let capacity = ring_capacity(device_rate, channels, buffer);
        let rb = HeapRb::<f32>::new(capacity);
        let (producer, consumer) = rb.split();

        let mixer = Arc::new(Mutex::new(Mixer {
            consumer,
            paused: false,
        }));

        let sample_format = config.sample_format();
        let stream_config: StreamConfig = config.into();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, mixer.clone())?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, mixer.clone())?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, mixer.clone())?,
            format => {
                return Err(PlayerError::Output(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| PlayerError::Output(format!("Failed to start stream: {}", e)))?;

        tracing::debug!(
            requested_rate = sample_rate,
            device_rate,
            channels,
            capacity,
            "audio sink initialized"
        );

        Ok(Self {
            _stream: stream,
            mixer,
            producer: Mutex::new(Some(producer)),
            sample_rate: device_rate,
            channels,
            stop: Arc::new(AtomicBool::new(false)),
            feeder: Mutex::new(None),
        })
    }

    /// Prefer a config at the stream's own rate with the default channel count
    fn pick_config(device: &cpal::Device, sample_rate: u32) -> Result<SupportedStreamConfig> {
        let default = device
            .default_output_config()
            .map_err(|e| PlayerError::Output(format!("Failed to get default output config: {}", e)))?;

        if default.sample_rate().0 == sample_rate {
            return Ok(default);
        }

        let matching = device.supported_output_configs().ok().and_then(|mut ranges| {
            ranges.find(|range| {
                range.channels() == default.channels()
                    && range.sample_format() == default.sample_format()
                    && range.min_sample_rate().0 <= sample_rate
                    && sample_rate <= range.max_sample_rate().0
            })
        });

        Ok(match matching {
            Some(range) => range.with_sample_rate(SampleRate(sample_rate)),
            None => default,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        mixer: Arc<Mutex<Mixer>>,
    ) -> Result<Stream> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut mixer = mixer.lock();

                    // Paused: emit silence and leave the buffer untouched
                    if mixer.paused {
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0);
                        }
                        return;
                    }

                    for sample in data.iter_mut() {
                        *sample = T::from_sample(mixer.consumer.try_pop().unwrap_or(0.0));
                    }
                },
                move |err| {
                    tracing::error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| PlayerError::Output(format!("Failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    /// Start streaming `stream` to the device.
    ///
    /// `on_complete` runs once, on the playback thread, after the decoder is
    /// exhausted and the buffered audio has been played. It is dropped without
    /// being called if decoding fails or the stream is closed first.
    pub fn play<F>(&self, stream: &DecodeStream, format: &StreamFormat, on_complete: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let producer = self
            .producer
            .lock()
            .take()
            .ok_or_else(|| PlayerError::Output("Audio sink is already playing".to_string()))?;

        let converter = SampleConverter::new(
            format.sample_rate,
            self.sample_rate,
            format.channels as usize,
            self.channels as usize,
        )?;

        let feed = Feed {
            reader: stream.reader(),
            producer,
            mixer: self.mixer.clone(),
            converter,
            in_channels: format.channels.max(1) as u64,
            stop: self.stop.clone(),
        };

        let handle = std::thread::Builder::new()
            .name("termplay-playback".to_string())
            .spawn(move || feed.run(on_complete))
            .map_err(PlayerError::Runtime)?;

        *self.feeder.lock() = Some(handle);
        Ok(())
    }

    /// Device sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Device channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl Transport for AudioSink {
    fn with_pause_lock<R>(&self, f: impl FnOnce(&mut bool) -> R) -> R {
        let mut mixer = self.mixer.lock();
        f(&mut mixer.paused)
    }
}

impl Drop for AudioSink {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.feeder.lock().take() {
            if handle.join().is_err() {
                tracing::error!("playback thread panicked");
            }
        }
        SINK_ACTIVE.store(false, Ordering::Release);
        tracing::debug!("audio sink released");
    }
}

/// Number of samples the ring buffer holds for `buffer` of audio
fn ring_capacity(sample_rate: u32, channels: u16, buffer: Duration) -> usize {
    let frames = (sample_rate as u128 * buffer.as_millis() / 1000) as usize;
    (frames * channels.max(1) as usize).max(1024)
}

/// The sink's playback activity: decode, convert, buffer
struct Feed {
    reader: StreamReader,
    producer: RingProducer,
    mixer: Arc<Mutex<Mixer>>,
    converter: SampleConverter,
    in_channels: u64,
    stop: Arc<AtomicBool>,
}

impl Feed {
    fn run<F: FnOnce()>(mut self, on_complete: F) {
        loop {
            if self.stopped() {
                return;
            }

            let chunk = match self.reader.next_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("playback stopped: {}", e);
                    return;
                }
            };

            let frames = chunk.len() as u64 / self.in_channels;
            let out = match self.converter.process(&chunk) {
                Ok(out) => out,
                Err(e) => {
                    tracing::error!("playback stopped: {}", e);
                    return;
                }
            };
            if !self.write_blocking(&out) {
                return;
            }
            self.reader.advance(frames);
        }

        // End of data, or the owner closed the stream
        if self.reader.is_closed() {
            return;
        }

        match self.converter.finish() {
            Ok(tail) => {
                if !self.write_blocking(&tail) {
                    return;
                }
            }
            Err(e) => {
                tracing::error!("playback stopped: {}", e);
                return;
            }
        }

        // Let the device play out what is buffered
        while self.producer.occupied_len() > 0 {
            if self.stopped() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        tracing::debug!("stream exhausted");
        on_complete();
    }

    /// Write samples, waiting for room while the device drains the buffer.
    /// Nothing is written while the output is paused, so the position holds.
    /// Returns false if playback was stopped first.
    fn write_blocking(&mut self, samples: &[f32]) -> bool {
        let mut remaining = samples;

        while !remaining.is_empty() {
            let written = if self.mixer.lock().paused {
                0
            } else {
                self.producer.push_slice(remaining)
            };
            if written > 0 {
                remaining = &remaining[written..];
            } else {
                // Buffer full or paused, wait a bit
                if self.stopped() {
                    return false;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        true
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire) || self.reader.is_closed()
    }
}
