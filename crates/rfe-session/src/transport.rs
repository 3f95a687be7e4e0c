//! Line-oriented transport over an async byte stream
//!
//! The analyzer terminates every record with `\n`. [`LineTransport`] owns
//! the buffered stream, hands out one raw line at a time and writes framed
//! commands back. It works over a real serial port or, for tests and
//! simulation, over a `tokio::io::duplex` stream.

use std::io;
use std::time::Duration;

use rfe_protocol::try_encode_command;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, trace};

use crate::error::ProtocolError;

/// Record delimiter emitted by the device
pub const LINE_DELIMITER: u8 = b'\n';

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 500_000;

/// Default time to wait for one line; the device is slow to answer
pub const DEFAULT_LINE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default silence that ends a drain of stale input
pub const DEFAULT_DRAIN_QUIET: Duration = Duration::from_millis(200);

/// Buffered line reader and frame writer
pub struct LineTransport<S> {
    stream: BufReader<S>,
}

impl<S> LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Read one delimiter-terminated line, delimiter included
    ///
    /// A stream that closes before any byte arrives is a transport failure.
    /// A final line without a delimiter is returned as-is.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, ProtocolError> {
        let mut line = Vec::new();
        match tokio::time::timeout(timeout, self.stream.read_until(LINE_DELIMITER, &mut line))
            .await
        {
            Ok(Ok(0)) => Err(ProtocolError::TransportFailure(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device closed the stream",
            ))),
            Ok(Ok(n)) => {
                trace!("Read {} byte line: {:?}", n, String::from_utf8_lossy(&line));
                Ok(line)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ProtocolError::Timeout(timeout)),
        }
    }

    /// Frame and send an ASCII command
    ///
    /// Commands that cannot be framed are rejected before any byte is
    /// written.
    pub async fn send_command(&mut self, command: &str) -> Result<(), ProtocolError> {
        let frame = try_encode_command(command)?;
        debug!("Sending command {:?}: {:02X?}", command, frame);

        let stream = self.stream.get_mut();
        stream.write_all(&frame).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Discard buffered and incoming bytes until the link has been quiet
    /// for `quiet`, or `limit` has elapsed
    ///
    /// Returns the number of bytes thrown away. A closed stream ends the
    /// drain early without error.
    pub async fn drain_input(
        &mut self,
        quiet: Duration,
        limit: Duration,
    ) -> Result<usize, ProtocolError> {
        let mut discarded = self.stream.buffer().len();
        self.stream.consume(discarded);

        let deadline = Instant::now() + limit;
        let mut buf = [0u8; 256];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("Drain limit reached after {} bytes", discarded);
                break;
            }
            match tokio::time::timeout(quiet.min(remaining), self.stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => discarded += n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            }
        }

        if discarded > 0 {
            debug!("Discarded {} bytes of stale input", discarded);
        }
        Ok(discarded)
    }

    /// Shut down the write half of the stream
    pub async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    /// Get a mutable reference to the underlying stream
    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }

    /// Unwrap the transport, dropping any buffered input
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

/// Open a serial port configured for the analyzer (8 data bits, 1 stop bit, no parity)
pub fn open_serial(
    port_name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<LineTransport<SerialStream>, ProtocolError> {
    debug!("Opening {} at {} baud", port_name, baud_rate);

    let stream = tokio_serial::new(port_name, baud_rate)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .timeout(timeout)
        .open_native_async()?;

    Ok(LineTransport::new(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_read_lines_in_order() {
        let (client, mut device) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        device.write_all(b"#Sn1234\r\n#a0\r\n").await.unwrap();

        let timeout = Duration::from_millis(200);
        assert_eq!(transport.read_line(timeout).await.unwrap(), b"#Sn1234\r\n");
        assert_eq!(transport.read_line(timeout).await.unwrap(), b"#a0\r\n");
    }

    #[tokio::test]
    async fn test_read_line_times_out() {
        let (client, _device) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        let err = transport
            .read_line(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_read_line_closed_stream() {
        let (client, device) = tokio::io::duplex(256);
        drop(device);
        let mut transport = LineTransport::new(client);

        let err = transport
            .read_line(Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::TransportFailure(_)));
    }

    #[tokio::test]
    async fn test_send_command_frames_bytes() {
        let (client, mut device) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        transport.send_command("C0").await.unwrap();

        let mut buf = [0u8; 4];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"#\x04C0");
    }

    #[tokio::test]
    async fn test_drain_discards_buffered_and_pending_lines() {
        let (client, mut device) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        device.write_all(b"#Sn1234\r\n#Se5678\r\n#a0\r\n").await.unwrap();
        let timeout = Duration::from_millis(200);
        assert_eq!(transport.read_line(timeout).await.unwrap(), b"#Sn1234\r\n");

        let discarded = transport
            .drain_input(Duration::from_millis(30), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(discarded, b"#Se5678\r\n#a0\r\n".len());

        device.write_all(b"RF Explorer\r\n").await.unwrap();
        assert_eq!(transport.read_line(timeout).await.unwrap(), b"RF Explorer\r\n");
    }

    #[tokio::test]
    async fn test_drain_stops_at_limit() {
        let (client, mut device) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        let chatter = tokio::spawn(async move {
            for _ in 0..50 {
                if device.write_all(b"$S\x01\r\n").await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let started = Instant::now();
        transport
            .drain_input(Duration::from_millis(50), Duration::from_millis(60))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));

        drop(transport);
        chatter.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_command_too_long_rejected() {
        let (client, _device) = tokio::io::duplex(1024);
        let mut transport = LineTransport::new(client);

        let err = transport
            .send_command(&"x".repeat(400))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::PreconditionViolation(_)));
    }
}
