// Terminal status screen
// Elapsed-time math and the redraw of title, format, time and transport flags

use std::fmt;
use std::io::{self, Write};

use crate::audio::format::{AudioFormat, StreamFormat};
use crate::audio::player::{PlayerState, SessionStatus};
use crate::metadata::TrackInfo;

/// ANSI: cursor home, then clear screen
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

const HELP_LINE: &str = "1: Pause/Resume | 2: Loop";

/// Whole hours, minutes and seconds played
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Time played at `position` frames, truncated to whole seconds.
/// A zero sample rate reads as nothing played.
pub fn elapsed(position: u64, sample_rate: u32) -> Elapsed {
    if sample_rate == 0 {
        return Elapsed::default();
    }

    let total = position / sample_rate as u64;
    Elapsed {
        hours: total / 3600,
        minutes: (total / 60) % 60,
        seconds: total % 60,
    }
}

/// Second line of the screen: codec, rate and depth, or bitrate for MP3
pub fn format_line(kind: AudioFormat, format: &StreamFormat, bitrate_kbps: Option<u32>) -> String {
    match kind {
        AudioFormat::Mp3 => format!("MP3 {:02}kbps", bitrate_kbps.unwrap_or(0)),
        _ => {
            let khz = format.sample_rate as f64 / 1000.0;
            // Only show the decimal when the kHz value has one
            let rate = if khz.fract() == 0.0 {
                format!("{:.0}", khz)
            } else {
                format!("{:.1}", khz)
            };
            format!("{} {}KHz/{:02}bit", kind.label(), rate, format.bits_per_sample)
        }
    }
}

/// "| PAUSED |", "| LOOP |", both, or nothing
pub fn indicator(state: PlayerState, loop_enabled: bool) -> String {
    let paused = state == PlayerState::Paused;
    let mut out = String::new();
    if paused {
        out.push_str("| PAUSED |");
    }
    if loop_enabled {
        if !paused {
            out.push('|');
        }
        out.push_str(" LOOP |");
    }
    out
}

/// Everything about the screen that stays fixed for a session
pub struct StatusView {
    title: String,
    subtitle: Option<String>,
    format_line: String,
    clear_screen: bool,
}

impl StatusView {
    pub fn new(info: &TrackInfo, format_line: String, clear_screen: bool) -> Self {
        let parts: Vec<&str> = [info.artist.as_deref(), info.album.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            title: info.title.clone(),
            subtitle: if parts.is_empty() {
                None
            } else {
                Some(parts.join(" • "))
            },
            format_line,
            clear_screen,
        }
    }

    /// Redraw the whole screen
    pub fn render<W: Write>(&self, out: &mut W, status: &SessionStatus) -> io::Result<()> {
        if self.clear_screen {
            out.write_all(CLEAR_SCREEN.as_bytes())?;
        }

        writeln!(out, "{}", self.title)?;
        if let Some(subtitle) = &self.subtitle {
            writeln!(out, "{}", subtitle)?;
        }
        writeln!(out, "{}", self.format_line)?;
        writeln!(out)?;
        writeln!(out, "Time: {}", status.elapsed)?;
        writeln!(out, "{}", HELP_LINE)?;
        writeln!(out)?;
        write!(out, "{}", indicator(status.state, status.loop_enabled))?;
        out.flush()
    }
}
