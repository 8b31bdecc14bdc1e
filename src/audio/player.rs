// Playback session: one attempt at playing a file, from open to exhaustion
use std::path::Path;

use super::decoder::DecodeStream;
use super::format::{self, AudioFormat, StreamFormat};
use super::output::Transport;
use crate::error::{PlayerError, Result};
use crate::status::{elapsed, Elapsed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    Completed,
}

/// What the status screen needs from a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: PlayerState,
    pub loop_enabled: bool,
    pub elapsed: Elapsed,
}

pub struct PlaybackSession {
    file_name: String,
    kind: AudioFormat,
    size_bytes: u64,
    stream: DecodeStream,
    format: StreamFormat,
    paused: bool,
    loop_enabled: bool,
    completed: bool,
}

impl PlaybackSession {
    /// Dispatch and decode `path`, carrying the loop flag from the previous attempt
    pub fn open(path: &Path, loop_enabled: bool) -> Result<Self> {
        let kind = AudioFormat::from_path(path)?;
        let (stream, format) = format::decode(path)?;
        let size_bytes = std::fs::metadata(path)
            .map_err(|source| PlayerError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        Ok(Self::new(path, kind, size_bytes, stream, format, loop_enabled))
    }

    pub(crate) fn new(
        path: &Path,
        kind: AudioFormat,
        size_bytes: u64,
        stream: DecodeStream,
        format: StreamFormat,
        loop_enabled: bool,
    ) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Self {
            file_name,
            kind,
            size_bytes,
            stream,
            format,
            paused: false,
            loop_enabled,
            completed: false,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn kind(&self) -> AudioFormat {
        self.kind
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    pub fn stream(&self) -> &DecodeStream {
        &self.stream
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn state(&self) -> PlayerState {
        if self.completed {
            PlayerState::Completed
        } else if self.paused {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        }
    }

    /// Flip between Playing and Paused inside the output lock
    pub fn toggle_pause<T: Transport>(&mut self, transport: &T) -> PlayerState {
        if self.completed {
            return PlayerState::Completed;
        }

        transport.with_pause_lock(|device_paused| {
            self.paused = !self.paused;
            *device_paused = self.paused;
        });
        tracing::debug!(paused = self.paused, "toggled pause");
        self.state()
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.loop_enabled = !self.loop_enabled;
        tracing::debug!(loop_enabled = self.loop_enabled, "toggled loop");
        self.loop_enabled
    }

    /// The stream was exhausted
    pub(crate) fn complete(&mut self) {
        self.completed = true;
    }

    pub fn elapsed(&self) -> Elapsed {
        elapsed(self.stream.position(), self.format.sample_rate)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state(),
            loop_enabled: self.loop_enabled,
            elapsed: self.elapsed(),
        }
    }

    /// End the session: close the stream and report whether to play again
    pub fn finish(self) -> bool {
        self.stream.close();
        self.loop_enabled
    }
}
