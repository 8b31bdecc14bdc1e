// Error types for the player
// Every variant is fatal: the caller prints it and exits non-zero.

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// Wrong number of positional arguments or an unknown flag
    #[error("{0}")]
    Argument(#[from] clap::Error),

    #[error("Failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type {extension:?} for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Couldn't read metadata from {}: {reason}", path.display())]
    MetadataRead { path: PathBuf, reason: String },

    /// The playback activity ended without reporting that the stream was exhausted
    #[error("Completion channel closed before playback finished")]
    ClosedCompletionSignal,

    #[error("Audio output error: {0}")]
    Output(String),

    #[error("Invalid settings file {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("Runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

impl PlayerError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PlayerError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status for this error. Usage errors follow the clap convention.
    pub fn exit_status(&self) -> u8 {
        match self {
            PlayerError::Argument(_) => 2,
            _ => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}
