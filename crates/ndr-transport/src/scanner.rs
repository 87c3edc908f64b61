//! Serial port scanner
//!
//! Lists the serial ports a radio console could be attached to.

use serde::Serialize;
use serialport::{available_ports, SerialPortType};
use tracing::info;

use crate::error::TransportError;

/// Information about a serial port
#[derive(Debug, Clone, Serialize)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB serial number (if available)
    pub serial_number: Option<String>,
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
                serial_number: usb.serial_number.clone(),
                product: usb.product.clone(),
            },
            _ => Self {
                port: name,
                vid: None,
                pid: None,
                serial_number: None,
                product: None,
            },
        }
    }
}

/// Serial port scanner
pub struct PortScanner {
    skip_patterns: Vec<String>,
}

impl PortScanner {
    pub fn new() -> Self {
        Self {
            skip_patterns: vec!["Bluetooth".to_string(), "debug".to_string()],
        }
    }

    /// Scanner that skips ports whose name contains any of `patterns`
    pub fn with_skip_patterns(patterns: Vec<String>) -> Self {
        Self {
            skip_patterns: patterns,
        }
    }

    /// Enumerate all available serial ports
    pub fn enumerate_ports(&self) -> Result<Vec<SerialPortInfo>, TransportError> {
        let ports =
            available_ports().map_err(|e| TransportError::EnumerationFailed(e.to_string()))?;

        let result: Vec<_> = ports
            .into_iter()
            .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type))
            .filter(|p| !self.should_skip(p))
            .collect();

        info!("Found {} serial port(s)", result.len());
        Ok(result)
    }

    fn should_skip(&self, port: &SerialPortInfo) -> bool {
        self.skip_patterns
            .iter()
            .any(|pattern| port.port.contains(pattern.as_str()))
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

    #[test]
    fn test_serial_port_info_from_usb() {
        let usb_info = SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x0403,
            pid: 0x6001,
            serial_number: Some("FT4XYZ".to_string()),
            manufacturer: Some("FTDI".to_string()),
            product: Some("NDR console".to_string()),
        });

        let info = SerialPortInfo::from_serialport("/dev/ttyUSB0".to_string(), &usb_info);
        assert_eq!(info.vid, Some(0x0403));
        assert_eq!(info.product.as_deref(), Some("NDR console"));
    }

    #[test]
    fn test_skip_patterns() {
        let scanner = PortScanner::new();
        let port = SerialPortInfo::from_serialport(
            "/dev/cu.Bluetooth-Incoming-Port".to_string(),
            &SerialPortType::Unknown,
        );
        assert!(scanner.should_skip(&port));
        let port = SerialPortInfo::from_serialport("/dev/ttyS0".to_string(), &SerialPortType::Unknown);
        assert!(!scanner.should_skip(&port));
    }
}
