//! Virtual analyzer actor task
//!
//! Owns a [`VirtualAnalyzer`] and serves it over an async stream, typically
//! one end of `tokio::io::duplex()`. Incoming bytes are decoded as command
//! frames; queued output lines are written back after each command.

use std::io;
use std::time::Duration;

use rfe_protocol::frame::decode_command;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::VirtualAnalyzer;

/// Options controlling how the virtual analyzer writes its output
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Pause between output lines, to mimic a slow device
    pub line_delay: Option<Duration>,
}

/// Run the virtual analyzer until the peer closes the stream
///
/// Returns the analyzer so callers can inspect the commands it received.
pub async fn run_virtual_analyzer_task<S>(
    mut stream: S,
    mut analyzer: VirtualAnalyzer,
    options: TaskOptions,
) -> io::Result<VirtualAnalyzer>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 256];
    let mut pending: Vec<u8> = Vec::new();

    info!("Starting virtual analyzer task");

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                debug!("Virtual analyzer stream closed");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Virtual analyzer stream error: {}", e);
                return Err(e);
            }
        };
        pending.extend_from_slice(&buf[..n]);

        loop {
            match decode_command(&pending) {
                Ok(Some((command, used))) => {
                    pending.drain(..used);
                    analyzer.process_command(&command);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Virtual analyzer dropping bad frame data: {}", e);
                    pending.clear();
                    break;
                }
            }
        }

        while let Some(line) = analyzer.take_output() {
            if let Err(e) = stream.write_all(&line).await {
                // Peer may hang up mid-dump; keep what we have
                debug!("Virtual analyzer write failed: {}", e);
                return Ok(analyzer);
            }
            if let Some(delay) = options.line_delay {
                tokio::time::sleep(delay).await;
            }
        }
        if let Err(e) = stream.flush().await {
            debug!("Virtual analyzer flush failed: {}", e);
            return Ok(analyzer);
        }
    }

    info!("Virtual analyzer task ended");
    Ok(analyzer)
}
