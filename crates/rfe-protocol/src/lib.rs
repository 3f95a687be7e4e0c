//! RF Explorer Protocol Library
//!
//! This crate provides framing and decoding for the configuration handshake
//! of RF Explorer spectrum analyzers:
//!
//! - **Frames**: length-prefixed ASCII commands sent to the device (`#`, length byte, command)
//! - **Lines**: device output tagged by first byte (greeting, DSP marker, metadata, sweep data)
//! - **Metadata**: `#`-prefixed records decoded through an ordered prefix table
//! - **DeviceConfig**: the snapshot the records fold into
//!
//! The crate does no I/O. The session driver in `rfe-session` feeds it lines
//! read from a serial port.
//!
//! # Example
//!
//! ```rust
//! use rfe_protocol::{classify, metadata, strip_corruption_marker, DeviceConfig, LineCategory};
//!
//! let mut config = DeviceConfig::new();
//! let raw: &[u8] = b"\xFF\xFE\xFF\xFE\x00#Sn1234\r\n";
//!
//! let stripped = strip_corruption_marker(raw);
//! assert!(stripped.recovered());
//!
//! if classify(stripped.line) == LineCategory::Metadata {
//!     let record = metadata::decode(stripped.line).unwrap();
//!     config.apply(&record);
//! }
//! assert_eq!(config.mainboard_sn.as_deref(), Some("1234"));
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod line;
pub mod metadata;
pub mod models;

pub use config::{DeviceConfig, SweepSettings};
pub use error::{FrameError, ParseError};
pub use frame::{encode_command, strip_corruption_marker, try_encode_command, StrippedLine};
pub use line::{classify, LineCategory};
pub use metadata::MetadataRecord;
pub use models::AnalyzerModel;
