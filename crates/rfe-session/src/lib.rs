//! RF Explorer Session Library
//!
//! This crate drives the configuration handshake with an RF Explorer
//! analyzer over a serial link:
//!
//! - [`LineTransport`]: buffered line reads and framed command writes over any async stream
//! - [`ConfigSession`]: the `C0` ... `#a` ... `CH` read loop and its state machine
//! - [`RfAnalyzer`]: mutex-guarded device handle that owns the transport
//! - [`PortScanner`]: serial port enumeration
//!
//! # Example
//!
//! ```rust,no_run
//! use rfe_session::{AnalyzerSettings, RfAnalyzer};
//!
//! # async fn run() -> Result<(), rfe_session::ProtocolError> {
//! let settings = AnalyzerSettings::for_port("/dev/ttyUSB0");
//! let analyzer = RfAnalyzer::open(&settings).await?;
//!
//! if let Some(snapshot) = analyzer.config().await {
//!     println!("{}", snapshot.config);
//! }
//! analyzer.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod error;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod transport;

pub use analyzer::RfAnalyzer;
pub use error::{ProtocolError, ScanError};
pub use scanner::{PortScanner, SerialPortInfo};
pub use session::{
    ConfigAccumulator, ConfigSession, ConfigSnapshot, Diagnostic, SessionConfig, SessionState,
};
pub use settings::AnalyzerSettings;
pub use transport::{open_serial, LineTransport};
