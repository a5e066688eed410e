//! Renders lifecycle events as lines on an output stream.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use philo_core::DiningEvent;

use crate::sink::EventReceiver;

/// Line format for rendered events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `[12:00:00.123] Philosopher 3 is eating`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Renders one event as a single line, without the trailing newline.
pub fn render(event: &DiningEvent, format: OutputFormat) -> io::Result<String> {
    match format {
        OutputFormat::Text => Ok(event.to_string()),
        OutputFormat::Json => serde_json::to_string(event)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
    }
}

/// Writes every event received until all senders are dropped.
///
/// Returns the number of lines written.
pub async fn run_reporter<W>(
    mut events: EventReceiver,
    mut out: W,
    format: OutputFormat,
) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut lines = 0;
    while let Some(event) = events.recv().await {
        let mut line = render(&event, format)?;
        line.push('\n');
        out.write_all(line.as_bytes()).await?;
        lines += 1;
    }
    out.flush().await?;
    debug!(lines, "Event reporter finished");
    Ok(lines)
}
