// termplay - terminal audio player
// Module declarations
pub mod audio;
pub mod cli;
pub mod commands;
pub mod driver;
pub mod error;
pub mod input;
pub mod metadata;
pub mod settings;
pub mod status;

#[cfg(test)]
mod test_support;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use error::{PlayerError, Result};
use input::InputPoller;
use settings::Settings;

pub use error::PlayerError as Error;

/// Parse arguments and play the file until it finishes without the loop flag set
pub fn run() -> Result<()> {
    init_tracing();

    let cli = Cli::try_parse()?;
    let settings = Settings::load(cli.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(PlayerError::Runtime)?;

    let mut input = InputPoller::spawn_stdin().map_err(PlayerError::Runtime)?;
    let start_looped = cli.start_looped || settings.playback.start_looped;

    let sessions = driver::run_looped(start_looped, |carry_loop| {
        runtime.block_on(driver::play_once(&cli.file, carry_loop, &settings, &mut input))
    })?;

    tracing::debug!(sessions, "playback finished");
    Ok(())
}

/// Logs go to stderr, quiet by default so they don't fight the status screen
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "termplay=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
