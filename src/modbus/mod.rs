//! Modbus transport handling
//!
//! The inverter is reached over a single RS232 serial line using Modbus RTU.
//! Framing and CRC are left to `tokio-modbus`; this module only opens the
//! port, issues register reads and closes the port again.

use async_trait::async_trait;
use std::time::Duration;
use tokio_modbus::prelude::*;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::config::DeviceConfig;

pub mod client;
pub mod reader;

pub use client::ModbusError;

/// Growatt RS232 line settings: 9600 baud, 8 data bits, no parity, 1 stop bit
pub const BAUD_RATE: u32 = 9600;

/// Modbus register space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterType {
    Holding,
    Input,
}

/// Capability used by the inverter driver to talk to the device
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Open the session
    async fn connect(&mut self) -> Result<(), ModbusError>;

    /// Read `count` holding registers starting at `address`
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: u8,
    ) -> Result<Vec<u16>, ModbusError>;

    /// Read `count` input registers starting at `address`
    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: u8,
    ) -> Result<Vec<u16>, ModbusError>;

    /// Close the session. Safe to call when not connected.
    fn close(&mut self);
}

/// Serial Modbus RTU transport
pub struct RtuTransport {
    port: String,
    timeout: Duration,
    context: Option<client::Context>,
}

impl RtuTransport {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            port: config.port.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            context: None,
        }
    }

    /// Serial device path
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Check if a session is open
    pub fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    fn context(&mut self) -> Result<&mut client::Context, ModbusError> {
        self.context.as_mut().ok_or(ModbusError::NotConnected)
    }
}

#[async_trait]
impl Transport for RtuTransport {
    async fn connect(&mut self) -> Result<(), ModbusError> {
        if self.context.is_some() {
            return Ok(());
        }

        let builder = tokio_serial::new(&self.port, BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .timeout(self.timeout);

        let port = builder.open_native_async()?;

        info!(
            "Serial port {} opened: {} baud, 8 data bits, no parity, 1 stop bit",
            self.port, BAUD_RATE
        );

        let ctx = rtu::attach(port);
        self.context = Some(client::Context::new(ctx, self.timeout));
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: u8,
    ) -> Result<Vec<u16>, ModbusError> {
        debug!(
            "Reading {} holding registers from address {} (unit {})",
            count, address, unit
        );
        self.context()?
            .read_holding_registers(address, count, unit)
            .await
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: u8,
    ) -> Result<Vec<u16>, ModbusError> {
        debug!(
            "Reading {} input registers from address {} (unit {})",
            count, address, unit
        );
        self.context()?
            .read_input_registers(address, count, unit)
            .await
    }

    fn close(&mut self) {
        // Dropping the context releases the serial port.
        if self.context.take().is_some() {
            debug!("Serial port {} closed", self.port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceConfig {
        DeviceConfig {
            port: "/dev/ttyUSB0".to_string(),
            unit_id: 1,
            timeout_ms: 1000,
        }
    }

    #[test]
    fn test_rtu_transport_starts_disconnected() {
        let transport = RtuTransport::new(&device());
        assert_eq!(transport.port(), "/dev/ttyUSB0");
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_close_without_session_is_noop() {
        let mut transport = RtuTransport::new(&device());
        transport.close();
        transport.close();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_read_without_session_fails() {
        let mut transport = RtuTransport::new(&device());
        let err = transport.read_input_registers(0, 44, 1).await.unwrap_err();
        assert!(matches!(err, ModbusError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_to_missing_port_fails() {
        let mut transport = RtuTransport::new(&DeviceConfig {
            port: "/dev/does-not-exist-growatt".to_string(),
            ..device()
        });
        assert!(transport.connect().await.is_err());
        assert!(!transport.is_connected());
    }
}
