// Background line reader for terminal commands
use std::io::{self, BufRead};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Lines read from stdin, delivered through an unbounded queue.
///
/// A dedicated thread does the blocking reads. At end of input the thread
/// drops its sender, which closes the queue for good.
pub struct InputPoller {
    rx: UnboundedReceiver<String>,
    closed: bool,
}

impl InputPoller {
    /// Start reading standard input
    pub fn spawn_stdin() -> io::Result<Self> {
        Self::spawn(io::BufReader::new(io::stdin()))
    }

    /// Start reading lines from `reader` on a background thread
    pub fn spawn<R: BufRead + Send + 'static>(mut reader: R) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("termplay-input".to_string())
            .spawn(move || {
                let mut line = Vec::new();
                loop {
                    line.clear();
                    // Raw bytes: a line that isn't valid UTF-8 is still a line
                    match reader.read_until(b'\n', &mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            let text = String::from_utf8_lossy(&line);
                            let text = text.trim_end_matches(&['\n', '\r'][..]).to_string();
                            if tx.send(text).is_err() {
                                // Nobody is listening any more
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("stopped reading input: {}", e);
                            break;
                        }
                    }
                }
                tracing::debug!("input closed");
            })?;

        Ok(Self { rx, closed: false })
    }

    pub(crate) fn from_receiver(rx: UnboundedReceiver<String>) -> Self {
        Self { rx, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for the next line. Returns None once input is exhausted.
    pub async fn next_line(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        let line = self.rx.recv().await;
        if line.is_none() {
            self.closed = true;
        }
        line
    }
}
