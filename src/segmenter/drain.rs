//! Segmenter log drain
//!
//! Forwards the segmenter's output to the log for the lifetime of the
//! process. ffmpeg reports progress on stderr, so stderr lines go out at
//! INFO; the rare stdout lines at DEBUG.
//!
//! Lines are read as raw bytes and decoded lossily: ffmpeg echoes input
//! metadata verbatim, which is not always UTF-8. The pipes stay open until
//! EOF or cancellation so the segmenter never writes into a closed pipe.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the drain task. It ends when both streams hit EOF or when `cancel`
/// fires. A read error only affects the stream it happened on.
pub fn spawn<O, E>(stdout: Option<O>, stderr: Option<E>, cancel: CancellationToken) -> JoinHandle<()>
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut out = stdout.map(OutputLines::new);
        let mut err = stderr.map(OutputLines::new);

        while out.is_some() || err.is_some() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Segmenter log drain cancelled");
                    return;
                }
                line = next_line(&mut err) => match line {
                    Ok(Some(line)) => tracing::info!("{}", line),
                    Ok(None) => err = None,
                    Err(e) => read_failed(&mut err, "stderr", e),
                },
                line = next_line(&mut out) => match line {
                    Ok(Some(line)) => tracing::debug!("{}", line),
                    Ok(None) => out = None,
                    Err(e) => read_failed(&mut out, "stdout", e),
                },
            }
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Lines are returned to the caller
    Forward,
    /// Lines are read and dropped, keeping the pipe flowing
    Discard,
    /// Reading gave up; the pipe is held open but no longer polled
    Parked,
}

/// One piped output stream, split into lines
struct OutputLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    mode: Mode,
}

impl<R: AsyncRead + Unpin> OutputLines<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
            mode: Mode::Forward,
        }
    }

    /// Next line without its terminator, `Ok(None)` at EOF. Cancel safe:
    /// a partially read line stays in the buffer for the next call.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if self.mode == Mode::Parked {
                return std::future::pending().await;
            }

            if let Err(e) = self.reader.read_until(b'\n', &mut self.buf).await {
                self.buf.clear();
                return Err(e);
            }
            if self.buf.is_empty() {
                return Ok(None);
            }

            let line = String::from_utf8_lossy(&self.buf)
                .trim_end_matches(|c: char| c == '\n' || c == '\r')
                .to_string();
            self.buf.clear();

            if self.mode == Mode::Forward {
                return Ok(Some(line));
            }
        }
    }

    /// Step down after a read error: first stop forwarding, then stop
    /// reading altogether.
    fn fail(&mut self, stream: &str, e: io::Error) {
        self.mode = match self.mode {
            Mode::Forward => {
                tracing::warn!(
                    "Failed to read segmenter {}: {}. Discarding further output",
                    stream,
                    e
                );
                Mode::Discard
            }
            Mode::Discard | Mode::Parked => {
                tracing::warn!("Segmenter {} is unreadable: {}", stream, e);
                Mode::Parked
            }
        };
    }
}

fn read_failed<R: AsyncRead + Unpin>(lines: &mut Option<OutputLines<R>>, stream: &str, e: io::Error) {
    if let Some(lines) = lines {
        lines.fail(stream, e);
    }
}

async fn next_line<R>(lines: &mut Option<OutputLines<R>>) -> io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}
