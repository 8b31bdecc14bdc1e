// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod convert;
pub mod decoder;
pub mod format;
pub mod output;
pub mod player;

pub use format::{decode, AudioFormat, StreamFormat};
pub use output::{AudioSink, Transport};
pub use player::{PlaybackSession, PlayerState};
