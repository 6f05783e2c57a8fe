//! Modbus RTU client context
//!
//! Wraps the `tokio-modbus` context so every read is bounded by a timeout and
//! addressed to an explicit unit.

use std::time::Duration;

use tokio::time::timeout;
use tokio_modbus::prelude::*;
use tokio_modbus::Exception;

/// Error type for Modbus operations
#[derive(Debug, thiserror::Error)]
pub enum ModbusError {
    #[error("Modbus exception: {0:?}")]
    Exception(Exception),
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_modbus::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[error("No response within {0:?}")]
    Timeout(Duration),
    #[error("Short response: expected {expected} registers, got {actual}")]
    ShortResponse { expected: u16, actual: usize },
    #[error("No connection available")]
    NotConnected,
}

/// RTU client context with a per-read timeout
pub struct Context {
    inner: tokio_modbus::client::Context,
    timeout: Duration,
}

impl Context {
    pub fn new(inner: tokio_modbus::client::Context, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub async fn read_holding_registers(
        &mut self,
        addr: u16,
        cnt: u16,
        unit: u8,
    ) -> Result<Vec<u16>, ModbusError> {
        self.inner.set_slave(Slave(unit));
        let result = timeout(self.timeout, self.inner.read_holding_registers(addr, cnt))
            .await
            .map_err(|_| ModbusError::Timeout(self.timeout))??;
        result.map_err(ModbusError::Exception)
    }

    pub async fn read_input_registers(
        &mut self,
        addr: u16,
        cnt: u16,
        unit: u8,
    ) -> Result<Vec<u16>, ModbusError> {
        self.inner.set_slave(Slave(unit));
        let result = timeout(self.timeout, self.inner.read_input_registers(addr, cnt))
            .await
            .map_err(|_| ModbusError::Timeout(self.timeout))??;
        result.map_err(ModbusError::Exception)
    }
}

/// Reject responses carrying fewer registers than requested.
pub fn check_len(values: Vec<u16>, expected: u16) -> Result<Vec<u16>, ModbusError> {
    if values.len() < usize::from(expected) {
        return Err(ModbusError::ShortResponse {
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}
