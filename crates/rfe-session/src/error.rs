//! Error types for analyzer sessions

use std::io;
use std::time::Duration;

use rfe_protocol::FrameError;
use thiserror::Error;

/// Errors that abort a configuration read
///
/// Record-level decode problems are not errors at this level; they are
/// collected as [`Diagnostic`](crate::Diagnostic)s on the snapshot.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Open, read or write failure on the underlying link
    #[error("transport failure: {0}")]
    TransportFailure(#[from] io::Error),

    /// No terminal record arrived within the read budget
    #[error("timed out after {0:?} waiting for the device")]
    Timeout(Duration),

    /// Caller asked for something that can never be sent
    #[error("precondition violation: {0}")]
    PreconditionViolation(#[from] FrameError),

    /// Read interrupted by the caller
    #[error("configuration read cancelled")]
    Cancelled,
}

impl ProtocolError {
    /// True for errors that retrying the whole read might clear
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProtocolError::Timeout(_) | ProtocolError::TransportFailure(_)
        )
    }
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        ProtocolError::TransportFailure(io::Error::from(e))
    }
}

/// Errors that can occur while scanning for devices
#[derive(Debug, Error)]
pub enum ScanError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),
}
