//! Analyzer device handle
//!
//! [`RfAnalyzer`] owns the transport behind a mutex so only one
//! command/response exchange is ever in flight. The lock is held for the
//! whole configuration read and released on every exit path.

use std::future::Future;

use rfe_protocol::frame::STOP_STREAMING;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_serial::SerialStream;
use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::session::{ConfigSession, ConfigSnapshot, SessionConfig};
use crate::settings::AnalyzerSettings;
use crate::transport::{open_serial, LineTransport};

/// A connected analyzer
pub struct RfAnalyzer<S> {
    transport: Mutex<LineTransport<S>>,
    session_config: SessionConfig,
    snapshot: Mutex<Option<ConfigSnapshot>>,
}

impl RfAnalyzer<SerialStream> {
    /// Open the serial port and read the device configuration
    pub async fn open(settings: &AnalyzerSettings) -> Result<Self, ProtocolError> {
        Self::open_until(settings, std::future::pending()).await
    }

    /// Open the serial port and read the device configuration, giving up
    /// when `cancel` completes
    ///
    /// The port is closed again if the initial read fails.
    pub async fn open_until<F>(
        settings: &AnalyzerSettings,
        cancel: F,
    ) -> Result<Self, ProtocolError>
    where
        F: Future<Output = ()>,
    {
        info!("Connecting to analyzer on {}", settings.port);
        let transport = open_serial(&settings.port, settings.baud_rate, settings.line_timeout())?;

        let analyzer = Self::from_transport(transport, settings.session_config());
        analyzer.read_config_until(cancel).await?;
        Ok(analyzer)
    }
}

impl<S> RfAnalyzer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open stream without talking to the device
    pub fn new(stream: S, session_config: SessionConfig) -> Self {
        Self::from_transport(LineTransport::new(stream), session_config)
    }

    fn from_transport(transport: LineTransport<S>, session_config: SessionConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            session_config,
            snapshot: Mutex::new(None),
        }
    }

    /// Read the device configuration, replacing the stored snapshot on success
    pub async fn read_config(&self) -> Result<ConfigSnapshot, ProtocolError> {
        self.read_config_until(std::future::pending()).await
    }

    /// Read the device configuration, giving up when `cancel` completes
    pub async fn read_config_until<F>(&self, cancel: F) -> Result<ConfigSnapshot, ProtocolError>
    where
        F: Future<Output = ()>,
    {
        let mut transport = self.transport.lock().await;
        let mut session = ConfigSession::new(self.session_config.clone());
        let snapshot = session.read_config_until(&mut *transport, cancel).await?;

        *self.snapshot.lock().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// The last successfully read configuration
    pub async fn config(&self) -> Option<ConfigSnapshot> {
        self.snapshot.lock().await.clone()
    }

    /// Send a single framed command
    pub async fn send_command(&self, command: &str) -> Result<(), ProtocolError> {
        let mut transport = self.transport.lock().await;
        transport.send_command(command).await
    }

    /// Stop streaming and shut the link down
    pub async fn close(self) -> Result<S, ProtocolError> {
        let mut transport = self.transport.into_inner();
        if let Err(e) = transport.send_command(STOP_STREAMING).await {
            warn!("Failed to send stop command on close: {}", e);
        }
        transport.shutdown().await?;
        debug!("Analyzer connection closed");
        Ok(transport.into_inner())
    }
}
