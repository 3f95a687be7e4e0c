//! Configuration read session
//!
//! A session sends the config request (`C0`), consumes device lines until
//! the `#a` input-stage record arrives, then sends the stop command (`CH`).
//!
//! ```text
//! Idle -> AwaitingResponse -> Complete
//!                          \-> Failed
//! ```
//!
//! Record-level problems (malformed payloads, unknown prefixes, torn
//! transmissions) never abort the read. They are collected as
//! [`Diagnostic`]s and returned with the snapshot. Only transport faults,
//! timeouts, cancellation and unframeable commands fail the session, and a
//! failed session returns no configuration at all.

use std::future::Future;
use std::time::Duration;

use rfe_protocol::frame::{CONFIG_REQUEST, STOP_STREAMING};
use rfe_protocol::{
    classify, metadata, strip_corruption_marker, DeviceConfig, LineCategory, MetadataRecord,
    ParseError,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

use crate::error::ProtocolError;
use crate::transport::{LineTransport, DEFAULT_DRAIN_QUIET, DEFAULT_LINE_TIMEOUT};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet
    Idle,
    /// Config request sent, reading records
    AwaitingResponse,
    /// Terminal record seen, snapshot returned
    Complete,
    /// Read aborted
    Failed,
}

/// Timing configuration for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time to wait for each line
    pub line_timeout: Duration,
    /// Optional bound on the whole read
    pub overall_timeout: Option<Duration>,
    /// Silence that ends the cleanup drain after a failed read
    pub drain_quiet: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            line_timeout: DEFAULT_LINE_TIMEOUT,
            overall_timeout: None,
            drain_quiet: DEFAULT_DRAIN_QUIET,
        }
    }
}

/// Non-fatal observation made during a read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A corruption marker was found and the torn prefix dropped
    PartialTransmission { discarded: usize },
    /// A known record had a malformed payload
    FieldDecode(ParseError),
    /// A metadata line matched no known prefix, or was not valid text
    UnrecognizedRecord { raw: Vec<u8>, invalid_text: bool },
}

/// Result of a completed configuration read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// The accumulated configuration
    pub config: DeviceConfig,
    /// Everything noteworthy seen along the way, in arrival order
    pub diagnostics: Vec<Diagnostic>,
}

impl ConfigSnapshot {
    /// Field decode errors only
    pub fn decode_errors(&self) -> impl Iterator<Item = &ParseError> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::FieldDecode(e) => Some(e),
            _ => None,
        })
    }

    /// Raw lines of unrecognized records
    pub fn unrecognized(&self) -> impl Iterator<Item = &[u8]> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::UnrecognizedRecord { raw, .. } => Some(raw.as_slice()),
            _ => None,
        })
    }

    /// Raw lines that could not be read as text
    pub fn invalid_text(&self) -> impl Iterator<Item = &[u8]> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::UnrecognizedRecord {
                raw,
                invalid_text: true,
            } => Some(raw.as_slice()),
            _ => None,
        })
    }

    /// Number of lines recovered after a corruption marker
    pub fn recovered_transmissions(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::PartialTransmission { .. }))
            .count()
    }
}

/// Folds raw device lines into a [`DeviceConfig`]
///
/// This is the I/O-free core of the session: feed it lines in arrival
/// order until [`ConfigAccumulator::feed`] reports the terminal record.
#[derive(Debug, Default)]
pub struct ConfigAccumulator {
    config: DeviceConfig,
    diagnostics: Vec<Diagnostic>,
}

impl ConfigAccumulator {
    /// Start from an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one raw line; returns true once the terminal record is seen
    pub fn feed(&mut self, raw: &[u8]) -> bool {
        let stripped = strip_corruption_marker(raw);
        if let Some(discarded) = stripped.discarded {
            self.diagnostics
                .push(Diagnostic::PartialTransmission { discarded });
        }
        let line = stripped.line;

        match classify(line) {
            LineCategory::Greeting => {
                self.config.set_greeting(line);
                debug!("Greeting: {:?}", self.config.greeting);
            }
            LineCategory::Metadata => self.feed_metadata(line),
            LineCategory::DspMarker => debug!("DSP marker"),
            LineCategory::SweepData => debug!("Sweep data ignored during config read"),
            LineCategory::Unknown => trace!("Ignoring line: {:02X?}", line),
        }

        metadata::is_terminal(line)
    }

    fn feed_metadata(&mut self, line: &[u8]) {
        match metadata::decode(line) {
            Ok(MetadataRecord::Unrecognized { raw, invalid_text }) => {
                if invalid_text {
                    warn!("Metadata line is not valid text: {:02X?}", raw);
                } else {
                    warn!(
                        "{:?} not handled by the metadata parser",
                        String::from_utf8_lossy(&raw)
                    );
                }
                self.diagnostics
                    .push(Diagnostic::UnrecognizedRecord { raw, invalid_text });
            }
            Ok(record) => {
                trace!("Decoded {:?}", record);
                self.config.apply(&record);
            }
            Err(e) => {
                warn!("Failed to decode metadata record: {}", e);
                self.diagnostics.push(Diagnostic::FieldDecode(e));
            }
        }
    }

    /// Finish and hand out the snapshot
    pub fn finish(self) -> ConfigSnapshot {
        ConfigSnapshot {
            config: self.config,
            diagnostics: self.diagnostics,
        }
    }
}

/// Drives one configuration read over a transport
#[derive(Debug)]
pub struct ConfigSession {
    config: SessionConfig,
    state: SessionState,
}

impl ConfigSession {
    /// Create a session in the `Idle` state
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Read the device configuration
    pub async fn read_config<S>(
        &mut self,
        transport: &mut LineTransport<S>,
    ) -> Result<ConfigSnapshot, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.read_config_until(transport, std::future::pending())
            .await
    }

    /// Read the device configuration, giving up when `cancel` completes
    ///
    /// Each call starts from an empty configuration. The stop command is
    /// sent on every exit path once the request has gone out. After a failed
    /// read the rest of the aborted dump is drained so a retry on the same
    /// transport starts in step with the device.
    pub async fn read_config_until<S, F>(
        &mut self,
        transport: &mut LineTransport<S>,
        cancel: F,
    ) -> Result<ConfigSnapshot, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        self.state = SessionState::AwaitingResponse;
        info!("Requesting device configuration");

        let result = {
            let exchange = Self::exchange(transport, self.config.line_timeout);
            let bounded = async {
                match self.config.overall_timeout {
                    Some(limit) => tokio::time::timeout(limit, exchange)
                        .await
                        .unwrap_or(Err(ProtocolError::Timeout(limit))),
                    None => exchange.await,
                }
            };

            tokio::select! {
                result = bounded => result,
                _ = cancel => Err(ProtocolError::Cancelled),
            }
        };

        match &result {
            Ok(_) => self.stop_streaming(transport).await,
            Err(ProtocolError::PreconditionViolation(_)) => {}
            Err(_) => {
                self.stop_streaming(transport).await;
                self.discard_stale_input(transport).await;
            }
        }

        match result {
            Ok(snapshot) => {
                self.state = SessionState::Complete;
                info!(
                    "Configuration read complete ({} diagnostics)",
                    snapshot.diagnostics.len()
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.state = SessionState::Failed;
                warn!("Configuration read failed: {}", e);
                Err(e)
            }
        }
    }

    async fn exchange<S>(
        transport: &mut LineTransport<S>,
        line_timeout: Duration,
    ) -> Result<ConfigSnapshot, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        transport.send_command(CONFIG_REQUEST).await?;

        let mut accumulator = ConfigAccumulator::new();
        loop {
            let line = transport.read_line(line_timeout).await?;
            if accumulator.feed(&line) {
                break;
            }
        }
        Ok(accumulator.finish())
    }

    /// Best-effort stop command; failures are logged, never returned
    async fn stop_streaming<S>(&self, transport: &mut LineTransport<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let send = transport.send_command(STOP_STREAMING);
        match tokio::time::timeout(self.config.line_timeout, send).await {
            Ok(Ok(())) => debug!("Stop command sent"),
            Ok(Err(e)) => warn!("Failed to send stop command: {}", e),
            Err(_) => warn!("Timed out sending stop command"),
        }
    }

    /// Drop whatever the device still sends from an aborted dump
    async fn discard_stale_input<S>(&self, transport: &mut LineTransport<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match transport
            .drain_input(self.config.drain_quiet, self.config.line_timeout)
            .await
        {
            Ok(0) => {}
            Ok(n) => info!("Discarded {} bytes left over from the aborted read", n),
            Err(e) => debug!("Drain after failed read stopped: {}", e),
        }
    }
}

impl Default for ConfigSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
