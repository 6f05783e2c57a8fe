//! Driver errors

use crate::growatt::codes::CodeTable;
use crate::growatt::registers::RegisterBlock;
use crate::modbus::ModbusError;

/// Failure of one `update()` call. The driver stays usable afterwards.
#[derive(Debug, thiserror::Error)]
pub enum GrowattError {
    #[error("Serial device {port} is not available")]
    DeviceUnavailable { port: String },

    #[error("Failed to connect to {port}: {source}")]
    TransportConnectFailed {
        port: String,
        #[source]
        source: ModbusError,
    },

    #[error("Failed to read {block} registers: {source}")]
    RegisterReadFailed {
        block: RegisterBlock,
        #[source]
        source: ModbusError,
    },

    #[error("No {table} label for code {code}")]
    UnknownCode { table: CodeTable, code: u16 },
}

pub type Result<T, E = GrowattError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GrowattError::DeviceUnavailable {
            port: "/dev/ttyUSB0".to_string(),
        };
        assert_eq!(err.to_string(), "Serial device /dev/ttyUSB0 is not available");

        let err = GrowattError::RegisterReadFailed {
            block: RegisterBlock::Data2,
            source: ModbusError::NotConnected,
        };
        assert_eq!(
            err.to_string(),
            "Failed to read data2 registers: No connection available"
        );

        let err = GrowattError::UnknownCode {
            table: CodeTable::Fault,
            code: 99,
        };
        assert_eq!(err.to_string(), "No fault label for code 99");
    }
}
