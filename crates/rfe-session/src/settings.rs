//! Connection settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;
use crate::transport::{DEFAULT_BAUD_RATE, DEFAULT_LINE_TIMEOUT};

/// How to reach an analyzer over a serial port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzerSettings {
    /// Serial port path
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Time to wait for each line, in milliseconds
    #[serde(default = "default_line_timeout_ms")]
    pub line_timeout_ms: u64,
    /// Optional bound on a whole configuration read, in milliseconds
    #[serde(default)]
    pub overall_timeout_ms: Option<u64>,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_line_timeout_ms() -> u64 {
    DEFAULT_LINE_TIMEOUT.as_millis() as u64
}

impl AnalyzerSettings {
    /// Settings for a port with every other value defaulted
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: default_baud_rate(),
            line_timeout_ms: default_line_timeout_ms(),
            overall_timeout_ms: None,
        }
    }

    /// Per-line timeout
    pub fn line_timeout(&self) -> Duration {
        Duration::from_millis(self.line_timeout_ms)
    }

    /// Session timing derived from these settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            line_timeout: self.line_timeout(),
            overall_timeout: self.overall_timeout_ms.map(Duration::from_millis),
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_port_defaults() {
        let settings = AnalyzerSettings::for_port("/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 500_000);
        assert_eq!(settings.line_timeout(), Duration::from_secs(10));
        assert_eq!(settings.session_config().overall_timeout, None);
    }

    #[test]
    fn test_session_config_overall_timeout() {
        let settings = AnalyzerSettings {
            overall_timeout_ms: Some(2500),
            ..AnalyzerSettings::for_port("COM3")
        };
        assert_eq!(
            settings.session_config().overall_timeout,
            Some(Duration::from_millis(2500))
        );
    }
}
