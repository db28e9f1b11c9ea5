//! Byte transports
//!
//! Provides the transport abstraction the session talks through and its
//! serial port implementation.
//!
//! Supports:
//! - Port enumeration filtered to USB/ACM style device ports
//! - Timed reads where a timeout yields an empty read, not an error
//! - Opening ports by name and baud rate

use rppkit_core::{ConnectionError, Error, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

/// An open, bidirectional byte stream
pub trait Transport: Send {
    /// Read whatever arrives within `timeout`
    ///
    /// Returns an empty buffer when nothing arrived.
    fn read(&mut self, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Write all bytes
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the stream; later reads and writes fail
    fn close(&mut self) -> io::Result<()>;

    /// Port name
    fn name(&self) -> String;
}

/// Opens transports by port name
pub trait Connector: Send + Sync {
    /// Open a port at the given baud rate
    fn open(&self, port: &str, baud_rate: u32) -> std::result::Result<Box<dyn Transport>, ConnectionError>;
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,
}

impl std::fmt::Display for SerialPortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.port_name, self.description)?;
        if let Some(mfg) = &self.manufacturer {
            write!(f, " [{}]", mfg)?;
        }
        Ok(())
    }
}

/// List serial ports a device may be attached to
///
/// Filters to:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports
            .iter()
            .filter(|port| is_device_port(&port.port_name))
            .map(|port| SerialPortInfo {
                port_name: port.port_name.clone(),
                description: describe_port(port),
                manufacturer: match &port.port_type {
                    serialport::SerialPortType::UsbPort(usb) => usb.manufacturer.clone(),
                    _ => None,
                },
            })
            .collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::other(format!("Failed to enumerate ports: {}", e)))
        }
    }
}

fn is_device_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }
    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn describe_port(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => format!(
            "USB {}",
            usb.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Opens ports through the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(&self, port: &str, baud_rate: u32) -> std::result::Result<Box<dyn Transport>, ConnectionError> {
        match serialport::new(port, baud_rate)
            .timeout(Duration::from_millis(10))
            .open()
        {
            Ok(handle) => {
                tracing::info!("Opened {} at {} baud", port, baud_rate);
                Ok(Box::new(SerialTransport {
                    name: port.to_string(),
                    port: Some(handle),
                }))
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", port, e);
                Err(ConnectionError::FailedToOpen {
                    port: port.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Serial port transport
struct SerialTransport {
    name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    fn port(&mut self) -> io::Result<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port closed"))
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
        let port = self.port()?;
        port.set_timeout(timeout).map_err(io::Error::from)?;
        let mut buf = [0u8; 1024];
        match port.read(&mut buf) {
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            tracing::debug!("Closed {}", self.name);
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_port_filter() {
        assert!(is_device_port("COM3"));
        assert!(is_device_port("/dev/ttyUSB0"));
        assert!(is_device_port("/dev/ttyACM1"));
        assert!(is_device_port("/dev/cu.usbmodem1101"));
        assert!(!is_device_port("COM"));
        assert!(!is_device_port("COMX"));
        assert!(!is_device_port("/dev/ttyS0"));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let err = SerialConnector
            .open("/dev/ttyUSB-does-not-exist", 115200)
            .err()
            .unwrap();
        assert!(matches!(err, ConnectionError::FailedToOpen { .. }));
    }
}
