// Session driver: the event loop for one playback attempt, and the loop/restart controller
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::audio::output::{AudioSink, Transport};
use crate::audio::player::{PlaybackSession, PlayerState};
use crate::commands::Command;
use crate::error::{PlayerError, Result};
use crate::input::InputPoller;
use crate::metadata::MetadataExtractor;
use crate::settings::Settings;
use crate::status::{self, StatusView};

/// Idle refresh period
pub const IDLE_TICK: Duration = Duration::from_secs(1);

enum Event {
    Line(Option<String>),
    Tick,
}

/// Merges terminal input, the idle timer and the completion signal for one session
pub struct SessionDriver<'a, T: Transport, W: Write> {
    session: PlaybackSession,
    transport: &'a T,
    input: &'a mut InputPoller,
    completion: oneshot::Receiver<()>,
    view: &'a StatusView,
    out: &'a mut W,
    tick: Duration,
}

impl<'a, T: Transport, W: Write> SessionDriver<'a, T, W> {
    pub fn new(
        session: PlaybackSession,
        transport: &'a T,
        input: &'a mut InputPoller,
        completion: oneshot::Receiver<()>,
        view: &'a StatusView,
        out: &'a mut W,
    ) -> Self {
        Self {
            session,
            transport,
            input,
            completion,
            view,
            out,
            tick: IDLE_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run until the stream is exhausted and hand back the finished session
    pub async fn run(mut self) -> Result<PlaybackSession> {
        let mut idle = time::interval_at(Instant::now() + self.tick, self.tick);
        idle.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let input_open = !self.input.is_closed();
            let event = tokio::select! {
                line = self.input.next_line(), if input_open => Event::Line(line),
                _ = idle.tick() => Event::Tick,
            };

            match event {
                Event::Line(Some(line)) => self.handle_command(Command::parse(&line)),
                Event::Line(None) => {
                    // Playback carries on; completion is still checked on each tick
                    tracing::debug!("input exhausted, waiting for playback to finish");
                }
                Event::Tick => match self.completion.try_recv() {
                    Ok(()) => {
                        self.session.complete();
                        return Ok(self.session);
                    }
                    Err(TryRecvError::Empty) => {
                        if self.session.state() == PlayerState::Playing {
                            self.render();
                        }
                    }
                    Err(TryRecvError::Closed) => return Err(PlayerError::ClosedCompletionSignal),
                },
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::TogglePause => {
                self.session.toggle_pause(self.transport);
            }
            Command::ToggleLoop => {
                self.session.toggle_loop();
            }
            Command::Refresh => {}
        }
        self.render();
    }

    fn render(&mut self) {
        if let Err(e) = self.view.render(&mut *self.out, &self.session.status()) {
            tracing::warn!("failed to draw status: {}", e);
        }
    }
}

/// Run one full playback attempt of `path`: dispatch, metadata, sink, session, driver.
/// Returns the session's final loop flag.
pub async fn play_once(
    path: &Path,
    carry_loop: bool,
    settings: &Settings,
    input: &mut InputPoller,
) -> Result<bool> {
    let session = PlaybackSession::open(path, carry_loop)?;

    let info = MetadataExtractor::read(
        path,
        session.kind(),
        session.size_bytes(),
        settings.display.filename_fallback,
    )?;
    let format_line = status::format_line(session.kind(), session.format(), info.bitrate_kbps);
    let view = StatusView::new(&info, format_line, settings.display.clear_screen);

    let sink = AudioSink::init(session.format().sample_rate, settings.playback.buffer())?;
    tracing::info!(
        file = session.file_name(),
        stream_rate = session.format().sample_rate,
        device_rate = sink.sample_rate(),
        device_channels = sink.channels(),
        "starting playback"
    );

    let mut stdout = io::stdout();
    if let Err(e) = view.render(&mut stdout, &session.status()) {
        tracing::warn!("failed to draw status: {}", e);
    }

    let (done_tx, done_rx) = oneshot::channel();
    sink.play(session.stream(), session.format(), move || {
        let _ = done_tx.send(());
    })?;

    let session = SessionDriver::new(session, &sink, input, done_rx, &view, &mut stdout)
        .with_tick(settings.playback.refresh())
        .run()
        .await?;

    Ok(session.finish())
}

/// Play sessions back to back while the loop flag is set.
///
/// `play` receives the loop flag to start with and returns the flag the
/// session ended with. Returns how many sessions ran.
pub fn run_looped<F>(start_looped: bool, mut play: F) -> Result<usize>
where
    F: FnMut(bool) -> Result<bool>,
{
    let mut carry_loop = start_looped;
    let mut sessions = 0;

    loop {
        let looped = play(carry_loop)?;
        sessions += 1;
        if !looped {
            return Ok(sessions);
        }
        tracing::info!(sessions, "loop enabled, restarting playback");
        carry_loop = true;
    }
}
