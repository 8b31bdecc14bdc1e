// Command line arguments
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "termplay", version)]
#[command(about = "Play an audio file in the terminal. Type 1 to pause/resume, 2 to toggle looping.", long_about = None)]
pub struct Cli {
    /// Audio file to play (.mp3, .flac, .ogg or .wav)
    pub file: PathBuf,

    /// Settings file (JSON)
    #[arg(long, env = "TERMPLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Start with looping enabled
    #[arg(long = "loop")]
    pub start_looped: bool,
}
