//! Serial port communication implementation
//!
//! Provides the hardware [`Link`] over USB serial and device discovery from a
//! list of candidate paths.

use super::{ConnectionParams, Link};
use inciser_core::{ConnectionError, Result};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::Duration;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,
    /// Port description (e.g., "USB Silicon Labs CP2102")
    pub description: String,
}

/// List serial ports that look like a USB engraver connection
///
/// - Windows: COM*
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectionError::Serial {
            reason: format!("Failed to enumerate ports: {}", e),
        }
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_engraver_port(&port.port_name))
        .map(|port| SerialPortInfo {
            port_name: port.port_name.clone(),
            description: port_description(port),
        })
        .collect())
}

fn is_engraver_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => format!(
            "USB {} {}",
            usb_info.manufacturer.as_deref().unwrap_or("Device"),
            usb_info.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Hardware link using the serialport crate
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    buffer: Vec<u8>,
}

impl SerialLink {
    /// Open a serial port with the given parameters (8N1, no flow control)
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        let port = serialport::new(&params.port, params.baud_rate)
            .timeout(Duration::from_millis(params.read_timeout_ms))
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                ConnectionError::FailedToOpen {
                    port: params.port.clone(),
                    reason: e.to_string(),
                }
            })?;

        Ok(Self {
            port,
            name: params.port.clone(),
            buffer: Vec::new(),
        })
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.buffer.drain(..=end).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }
}

impl Link for SerialLink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.port.write_all(format!("{}\r\n", line).as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    fn has_pending(&mut self) -> Result<bool> {
        if !self.buffer.is_empty() {
            return Ok(true);
        }
        let waiting = self
            .port
            .bytes_to_read()
            .map_err(|e| ConnectionError::Serial {
                reason: e.to_string(),
            })?;
        Ok(waiting > 0)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }
            match self.port.read(&mut chunk) {
                Ok(0) => return Err(ConnectionError::Closed.into()),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Open the first candidate path that exists and accepts a connection
///
/// Fails with [`ConnectionError::NoDevice`] when none does; the ports the
/// system does know about are logged to help fix the candidate list.
pub fn open_first_available(candidates: &[String], baud_rate: u32) -> Result<SerialLink> {
    for candidate in candidates {
        if !Path::new(candidate).exists() {
            tracing::debug!("Candidate {} does not exist", candidate);
            continue;
        }
        tracing::info!("Connecting to {}", candidate);
        match SerialLink::open(&ConnectionParams::new(candidate.as_str(), baud_rate)) {
            Ok(link) => return Ok(link),
            Err(e) => tracing::warn!("Skipping {}: {}", candidate, e),
        }
    }

    match list_ports() {
        Ok(ports) if !ports.is_empty() => {
            for port in ports {
                tracing::info!("Available port: {} ({})", port.port_name, port.description);
            }
        }
        Ok(_) => tracing::info!("No USB serial ports detected"),
        Err(e) => tracing::debug!("Port enumeration failed: {}", e),
    }

    Err(ConnectionError::NoDevice {
        candidates: candidates.to_vec(),
    }
    .into())
}
