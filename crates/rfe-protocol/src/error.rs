//! Error types for RF Explorer frame and record decoding

use thiserror::Error;

/// Errors that can occur while decoding a metadata record payload
///
/// Every variant carries the record prefix that matched, so a caller
/// collecting these as warnings can tell which record was malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseError {
    /// Payload could not be decoded as UTF-8 text
    #[error("{record}: payload is not valid UTF-8")]
    InvalidText { record: String },

    /// A numeric field did not hold a base-10 integer
    #[error("{record}: invalid integer field {index}: {value:?}")]
    InvalidInteger {
        record: String,
        index: usize,
        value: String,
    },

    /// Wrong number of comma-separated fields
    #[error("{record}: expected {expected} fields, got {actual}")]
    FieldCount {
        record: String,
        expected: usize,
        actual: usize,
    },

    /// Line too short to hold a fixed-offset field
    #[error("{record}: line too short, need {needed} bytes, got {actual}")]
    Truncated {
        record: String,
        needed: usize,
        actual: usize,
    },
}

impl ParseError {
    /// The record prefix this error belongs to
    pub fn record(&self) -> &str {
        match self {
            ParseError::InvalidText { record }
            | ParseError::InvalidInteger { record, .. }
            | ParseError::FieldCount { record, .. }
            | ParseError::Truncated { record, .. } => record,
        }
    }
}

/// Errors from the outbound command framing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Command does not fit the single length byte
    #[error("command too long to frame: {len} bytes (max {max})")]
    CommandTooLong { len: usize, max: usize },

    /// Command contains non-ASCII characters
    #[error("command is not ASCII: {0:?}")]
    NonAsciiCommand(String),

    /// Frame does not start with `#`
    #[error("invalid frame start byte: 0x{0:02X}")]
    InvalidStart(u8),

    /// Length byte is smaller than the frame header
    #[error("invalid frame length byte: {0}")]
    InvalidLength(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accessor() {
        let err = ParseError::FieldCount {
            record: "#C2-F:".into(),
            expected: 13,
            actual: 12,
        };
        assert_eq!(err.record(), "#C2-F:");
        assert_eq!(err.to_string(), "#C2-F:: expected 13 fields, got 12");
    }
}
