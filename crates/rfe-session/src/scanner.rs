//! Serial port scanner
//!
//! Lists serial ports and flags the ones behind the USB-UART bridge fitted
//! to RF Explorer units.

use serialport::{available_ports, SerialPortType};
use tracing::info;

use crate::error::ScanError;

/// USB vendor ID of the Silicon Labs CP210x bridge
pub const CP210X_VID: u16 = 0x10C4;

/// USB product ID of the Silicon Labs CP210x bridge
pub const CP210X_PID: u16 = 0xEA60;

/// Information about a serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB product string
    pub product: Option<String>,
}

impl SerialPortInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product.clone(),
            },
            _ => Self {
                port: name,
                vid: None,
                pid: None,
                product: None,
            },
        }
    }

    /// True if the port sits behind the analyzer's USB bridge
    pub fn is_likely_analyzer(&self) -> bool {
        self.vid == Some(CP210X_VID) && self.pid == Some(CP210X_PID)
    }
}

/// Serial port scanner
#[derive(Debug, Clone)]
pub struct PortScanner {
    skip_patterns: Vec<String>,
}

impl PortScanner {
    /// Create a scanner that skips Bluetooth and debug ports
    pub fn new() -> Self {
        Self {
            skip_patterns: vec!["Bluetooth".to_string(), "debug".to_string()],
        }
    }

    /// Create a scanner with custom skip patterns
    pub fn with_skip_patterns(skip_patterns: Vec<String>) -> Self {
        Self { skip_patterns }
    }

    /// Enumerate all available serial ports
    pub fn enumerate_ports(&self) -> Result<Vec<SerialPortInfo>, ScanError> {
        info!("Enumerating serial ports...");
        let ports = available_ports().map_err(|e| ScanError::EnumerationFailed(e.to_string()))?;

        let result: Vec<_> = ports
            .into_iter()
            .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type))
            .filter(|p| !self.should_skip_port(p))
            .collect();

        info!("Found {} serial port(s)", result.len());
        Ok(result)
    }

    /// Ports that look like an attached analyzer
    pub fn analyzer_ports(&self) -> Result<Vec<SerialPortInfo>, ScanError> {
        Ok(self
            .enumerate_ports()?
            .into_iter()
            .filter(SerialPortInfo::is_likely_analyzer)
            .collect())
    }

    fn should_skip_port(&self, port: &SerialPortInfo) -> bool {
        self.skip_patterns.iter().any(|p| port.port.contains(p))
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb_port(vid: u16, pid: u16) -> SerialPortType {
        SerialPortType::UsbPort(UsbPortInfo {
            vid,
            pid,
            serial_number: None,
            manufacturer: Some("Silicon Labs".to_string()),
            product: Some("CP2102 USB to UART Bridge Controller".to_string()),
        })
    }

    #[test]
    fn test_cp210x_port_is_analyzer() {
        let info = SerialPortInfo::from_serialport(
            "/dev/ttyUSB0".to_string(),
            &usb_port(CP210X_VID, CP210X_PID),
        );
        assert!(info.is_likely_analyzer());
        assert_eq!(
            info.product.as_deref(),
            Some("CP2102 USB to UART Bridge Controller")
        );
    }

    #[test]
    fn test_other_usb_port_is_not_analyzer() {
        let info = SerialPortInfo::from_serialport("COM4".to_string(), &usb_port(0x0403, 0x6001));
        assert!(!info.is_likely_analyzer());
    }

    #[test]
    fn test_skip_patterns() {
        let scanner = PortScanner::new();
        let bt = SerialPortInfo::from_serialport(
            "/dev/cu.Bluetooth-Incoming-Port".to_string(),
            &SerialPortType::Unknown,
        );
        assert!(scanner.should_skip_port(&bt));
    }
}
