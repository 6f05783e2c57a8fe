//! Growatt inverter driver
//!
//! Reads the identity block once and the two measurement blocks on every
//! poll, then decodes them into an [`InverterSnapshot`].
//!
//! Register positions follow the "Growatt PV Inverter Modbus RS485 RTU
//! Protocol V3.14". Which attributes carry meaningful values depends on the
//! inverter firmware.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{Config, DecodingConfig};
use crate::error::{GrowattError, Result};
use crate::modbus::{RegisterType, Transport};

pub mod codec;
pub mod codes;
pub mod registers;
pub mod snapshot;

use codes::{CodeTable, UnknownCodePolicy};
use registers::{DataBlock, Field, Form, RegisterBlock, Scale};
pub use snapshot::{InverterIdentity, InverterSnapshot, Value};

/// Open transport session, closed when dropped.
struct Session<'a, T: Transport> {
    transport: &'a mut T,
}

impl<'a, T: Transport> Session<'a, T> {
    async fn open(transport: &'a mut T, port: &str) -> Result<Self> {
        let connected = transport.connect().await;
        match connected {
            Ok(()) => Ok(Self { transport }),
            Err(source) => {
                // A half-open port must not outlive the failed attempt.
                transport.close();
                Err(GrowattError::TransportConnectFailed {
                    port: port.to_string(),
                    source,
                })
            }
        }
    }

    async fn read(&mut self, block: RegisterBlock, unit: u8) -> Result<Vec<u16>> {
        let result = match block.register_type() {
            RegisterType::Holding => {
                self.transport
                    .read_holding_registers(block.address(), block.count(), unit)
                    .await
            }
            RegisterType::Input => {
                self.transport
                    .read_input_registers(block.address(), block.count(), unit)
                    .await
            }
        };

        let values = result.map_err(|source| GrowattError::RegisterReadFailed { block, source })?;
        crate::modbus::client::check_len(values, block.count())
            .map_err(|source| GrowattError::RegisterReadFailed { block, source })
    }
}

impl<T: Transport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// The two measurement blocks of one poll
struct DataBlocks {
    data1: Vec<u16>,
    data2: Vec<u16>,
}

impl DataBlocks {
    fn get(&self, block: DataBlock) -> &[u16] {
        match block {
            DataBlock::Data1 => &self.data1,
            DataBlock::Data2 => &self.data2,
        }
    }
}

/// Growatt inverter attached to a serial Modbus RTU line
pub struct GrowattInverter<T: Transport> {
    transport: T,
    port: String,
    unit_id: u8,
    decoding: DecodingConfig,
    identity: Option<InverterIdentity>,
    snapshot: Option<InverterSnapshot>,
}

impl<T: Transport> GrowattInverter<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        debug!(
            "Growatt inverter using serial port {} and modbus address {}",
            config.device.port, config.device.unit_id
        );

        Self {
            transport,
            port: config.device.port.clone(),
            unit_id: config.device.unit_id,
            decoding: config.decoding.clone(),
            identity: None,
            snapshot: None,
        }
    }

    /// Cached identity, once it has been read
    pub fn identity(&self) -> Option<&InverterIdentity> {
        self.identity.as_ref()
    }

    /// Last successfully decoded snapshot
    pub fn snapshot(&self) -> Option<&InverterSnapshot> {
        self.snapshot.as_ref()
    }

    /// Completion time of the last successful update
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot.as_ref().map(InverterSnapshot::timestamp)
    }

    /// True once a snapshot is available
    pub fn is_available(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Poll the inverter and replace the current snapshot.
    ///
    /// On error the previous snapshot is kept and the transport is closed.
    pub async fn update(&mut self) -> Result<&InverterSnapshot> {
        if !Path::new(&self.port).exists() {
            return Err(GrowattError::DeviceUnavailable {
                port: self.port.clone(),
            });
        }

        let blocks = self.read_blocks().await?;
        let identity = self.identity.clone().unwrap_or_default();
        let snapshot = decode_snapshot(&identity, &blocks, &self.decoding, Utc::now())?;

        debug!("Data: {:?}", snapshot);
        Ok(self.snapshot.insert(snapshot))
    }

    /// Connect, resolve identity if needed and read both data blocks.
    /// The session is closed on every return path.
    async fn read_blocks(&mut self) -> Result<DataBlocks> {
        let unit = self.unit_id;
        let mut session = Session::open(&mut self.transport, &self.port).await?;

        if self.identity.is_none() {
            let block = session.read(RegisterBlock::Identity, unit).await?;
            let identity = decode_identity(&block);
            info!(
                "Growatt inverter with serial number {} is model {} and has firmware {}",
                identity.serial_number, identity.model_number, identity.firmware
            );
            self.identity = Some(identity);
        }

        let data1 = session.read(RegisterBlock::Data1, unit).await?;
        let data2 = session.read(RegisterBlock::Data2, unit).await?;

        Ok(DataBlocks { data1, data2 })
    }
}

/// Decode firmware, serial number and model code from the identity block
pub fn decode_identity(block: &[u16]) -> InverterIdentity {
    InverterIdentity {
        firmware: codec::decode_ascii_text(
            block,
            registers::FIRMWARE_START,
            registers::FIRMWARE_REGISTERS,
        ),
        serial_number: codec::decode_ascii_text(
            block,
            registers::SERIAL_NUMBER_START,
            registers::SERIAL_NUMBER_REGISTERS,
        ),
        model_number: codec::decode_model_code(block, registers::MODEL_CODE_HIGH),
    }
}

fn decode_field(field: &Field, block: &[u16], decoding: &DecodingConfig) -> f64 {
    let scale = match field.scale {
        Scale::Fixed(s) => s,
        Scale::OperationHours => decoding.operation_hours_divisor,
    };
    match field.form {
        Form::Single => codec::decode_scaled_single(block, field.index, scale),
        Form::Double => codec::decode_scaled_double(block, field.index, scale),
    }
}

fn resolve_label(table: CodeTable, code: u16, policy: UnknownCodePolicy) -> Result<String> {
    match table.lookup(code) {
        Some(label) => Ok(label.into_owned()),
        None => match policy {
            UnknownCodePolicy::Label => {
                warn!("Unknown {} code {}", table, code);
                Ok(codes::unknown_label(code))
            }
            UnknownCodePolicy::Fail => Err(GrowattError::UnknownCode { table, code }),
        },
    }
}

fn decode_snapshot(
    identity: &InverterIdentity,
    blocks: &DataBlocks,
    decoding: &DecodingConfig,
    now: DateTime<Utc>,
) -> Result<InverterSnapshot> {
    let mut values = BTreeMap::new();

    // Inverter properties
    values.insert("serial_number", Value::Text(identity.serial_number.clone()));
    values.insert("model_number", Value::Text(identity.model_number.clone()));
    values.insert("firmware", Value::Text(identity.firmware.clone()));

    for field in registers::FIELDS {
        let number = decode_field(field, blocks.get(field.block), decoding);
        values.insert(field.name, Value::Number(number));
    }
    values.insert(
        decoding.input_energy_key.name(),
        Value::Number(codec::decode_scaled_double(
            &blocks.data2,
            registers::INPUT_ENERGY_INDEX,
            codec::DEFAULT_SCALE,
        )),
    );

    // Status, faults, warnings and derating
    let coded = [
        ("status_code", "status", CodeTable::Status, blocks.data1[registers::STATUS_CODE]),
        ("fault_code", "fault", CodeTable::Fault, blocks.data1[registers::FAULT_CODE]),
        ("warning_code", "warning", CodeTable::Warning, blocks.data2[registers::WARNING_CODE]),
        ("derating_mode", "derating", CodeTable::Derating, blocks.data2[registers::DERATING_MODE]),
    ];
    for (code_key, label_key, table, code) in coded {
        let label = resolve_label(table, code, decoding.unknown_codes)?;
        values.insert(code_key, Value::Code(code));
        values.insert(label_key, Value::Text(label));
    }
    values.insert(
        "warning_value",
        Value::Code(blocks.data2[registers::WARNING_VALUE]),
    );

    Ok(InverterSnapshot::new(values, now))
}
