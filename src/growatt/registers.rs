//! Growatt register map
//!
//! Block layout and the field table that maps register positions to named
//! snapshot attributes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modbus::RegisterType;

/// One of the three register blocks read from the inverter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterBlock {
    /// Holding registers 0..30: firmware, serial number, model code
    Identity,
    /// Input registers 0..44
    Data1,
    /// Input registers 45..66
    Data2,
}

impl RegisterBlock {
    pub const fn address(self) -> u16 {
        match self {
            RegisterBlock::Identity => 0,
            RegisterBlock::Data1 => 0,
            RegisterBlock::Data2 => 45,
        }
    }

    pub const fn count(self) -> u16 {
        match self {
            RegisterBlock::Identity => 30,
            RegisterBlock::Data1 => 44,
            RegisterBlock::Data2 => 21,
        }
    }

    pub const fn register_type(self) -> RegisterType {
        match self {
            RegisterBlock::Identity => RegisterType::Holding,
            RegisterBlock::Data1 | RegisterBlock::Data2 => RegisterType::Input,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RegisterBlock::Identity => "identity",
            RegisterBlock::Data1 => "data1",
            RegisterBlock::Data2 => "data2",
        }
    }
}

/// Block holding a numeric field; identity registers carry no measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBlock {
    Data1,
    Data2,
}

impl From<DataBlock> for RegisterBlock {
    fn from(block: DataBlock) -> Self {
        match block {
            DataBlock::Data1 => RegisterBlock::Data1,
            DataBlock::Data2 => RegisterBlock::Data2,
        }
    }
}

impl fmt::Display for RegisterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Identity block positions
pub const FIRMWARE_START: usize = 9;
pub const FIRMWARE_REGISTERS: usize = 3;
pub const SERIAL_NUMBER_START: usize = 23;
pub const SERIAL_NUMBER_REGISTERS: usize = 5;
pub const MODEL_CODE_HIGH: usize = 28;

// Code positions in the data blocks
pub const STATUS_CODE: usize = 0; // data1
pub const FAULT_CODE: usize = 40; // data1
pub const DERATING_MODE: usize = 2; // data2
pub const WARNING_CODE: usize = 19; // data2
pub const WARNING_VALUE: usize = 20; // data2

// Units of measurement
pub const VOLT: &str = "V";
pub const AMPERE: &str = "A";
pub const WATT: &str = "W";
pub const VAR: &str = "var";
pub const HOURS: &str = "h";
pub const KILO_WATT_HOUR: &str = "kWh";
pub const KILO_VAR_HOUR: &str = "kvarh";
pub const HERTZ: &str = "Hz";
pub const CELSIUS: &str = "°C";

/// Register layout of a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// One register
    Single,
    /// Two registers, high word first
    Double,
}

/// Divisor of a numeric field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Fixed(f64),
    /// Taken from `DecodingConfig::operation_hours_divisor`
    OperationHours,
}

/// A numeric snapshot attribute
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub block: DataBlock,
    pub index: usize,
    pub form: Form,
    pub scale: Scale,
    pub unit: Option<&'static str>,
}

const fn field(
    name: &'static str,
    block: DataBlock,
    index: usize,
    form: Form,
    scale: f64,
    unit: Option<&'static str>,
) -> Field {
    Field {
        name,
        block,
        index,
        form,
        scale: Scale::Fixed(scale),
        unit,
    }
}

use Form::{Double, Single};
use DataBlock::{Data1, Data2};

/// Key of the PV energy counter at data2[11]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputEnergyKey {
    /// `input_energy_total`
    #[default]
    Total,
    /// `input_energy_today`, the key used by older drivers for the same register
    Today,
}

impl InputEnergyKey {
    pub fn name(self) -> &'static str {
        match self {
            InputEnergyKey::Total => "input_energy_total",
            InputEnergyKey::Today => "input_energy_today",
        }
    }
}

/// The PV energy counter; its key depends on [`InputEnergyKey`].
pub const INPUT_ENERGY_INDEX: usize = 11;

/// Every numeric field except the PV energy counter
pub const FIELDS: &[Field] = &[
    // DC input PV
    field("input_power", Data1, 1, Double, 10.0, Some(WATT)),
    // DC input string 1
    field("input_1_voltage", Data1, 3, Single, 10.0, Some(VOLT)),
    field("input_1_amperage", Data1, 4, Single, 10.0, Some(AMPERE)),
    field("input_1_power", Data1, 5, Double, 10.0, Some(WATT)),
    field("input_1_energy_today", Data2, 3, Double, 10.0, Some(KILO_WATT_HOUR)),
    field("input_1_energy_total", Data2, 5, Double, 10.0, Some(KILO_WATT_HOUR)),
    // DC input string 2
    field("input_2_voltage", Data1, 7, Single, 10.0, Some(VOLT)),
    field("input_2_amperage", Data1, 8, Single, 10.0, Some(AMPERE)),
    field("input_2_power", Data1, 9, Double, 10.0, Some(WATT)),
    field("input_2_energy_today", Data2, 7, Double, 10.0, Some(KILO_WATT_HOUR)),
    field("input_2_energy_total", Data2, 9, Double, 10.0, Some(KILO_WATT_HOUR)),
    // AC output grid
    field("output_power", Data1, 11, Double, 10.0, Some(WATT)),
    field("output_energy_today", Data1, 26, Double, 10.0, Some(KILO_WATT_HOUR)),
    field("output_energy_total", Data1, 28, Double, 10.0, Some(KILO_WATT_HOUR)),
    field("output_power_factor", Data2, 0, Single, 10.0, None),
    field("output_reactive_power", Data2, 13, Double, 10.0, Some(VAR)),
    field("output_reactive_energy_today", Data2, 15, Double, 10.0, Some(KILO_VAR_HOUR)),
    field("output_reactive_energy_total", Data2, 17, Double, 10.0, Some(KILO_VAR_HOUR)),
    // AC output phases
    field("output_1_voltage", Data1, 14, Single, 10.0, Some(VOLT)),
    field("output_1_amperage", Data1, 15, Single, 10.0, Some(AMPERE)),
    field("output_1_power", Data1, 16, Double, 10.0, Some(WATT)),
    field("output_2_voltage", Data1, 18, Single, 10.0, Some(VOLT)),
    field("output_2_amperage", Data1, 19, Single, 10.0, Some(AMPERE)),
    field("output_2_power", Data1, 20, Double, 10.0, Some(WATT)),
    field("output_3_voltage", Data1, 22, Single, 10.0, Some(VOLT)),
    field("output_3_amperage", Data1, 23, Single, 10.0, Some(AMPERE)),
    field("output_3_power", Data1, 24, Double, 10.0, Some(WATT)),
    // Miscellaneous
    Field {
        name: "operation_hours",
        block: Data1,
        index: 30,
        form: Double,
        scale: Scale::OperationHours,
        unit: Some(HOURS),
    },
    field("frequency", Data1, 13, Single, 100.0, Some(HERTZ)),
    field("temperature", Data1, 32, Single, 10.0, Some(CELSIUS)),
    field("ipm_temperature", Data1, 41, Single, 10.0, Some(CELSIUS)),
    field("p_bus_voltage", Data1, 42, Single, 10.0, Some(VOLT)),
    field("n_bus_voltage", Data1, 43, Single, 10.0, Some(VOLT)),
];

/// Non-numeric attributes: identity text, raw codes and their labels
pub const TEXT_AND_CODE_ATTRIBUTES: &[&str] = &[
    "serial_number",
    "model_number",
    "firmware",
    "status_code",
    "status",
    "fault_code",
    "fault",
    "warning_code",
    "warning",
    "warning_value",
    "derating_mode",
    "derating",
];

/// Unit of a snapshot attribute, `None` for text, codes and unknown names
pub fn unit_of(name: &str) -> Option<&'static str> {
    if name == InputEnergyKey::Total.name() || name == InputEnergyKey::Today.name() {
        return Some(KILO_WATT_HOUR);
    }
    FIELDS.iter().find(|f| f.name == name).and_then(|f| f.unit)
}

/// Every key a snapshot carries for the given PV energy key
pub fn attribute_names(input_energy: InputEnergyKey) -> Vec<&'static str> {
    TEXT_AND_CODE_ATTRIBUTES
        .iter()
        .copied()
        .chain(std::iter::once(input_energy.name()))
        .chain(FIELDS.iter().map(|f| f.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_block_layout() {
        assert_eq!(RegisterBlock::Identity.count(), 30);
        assert_eq!(RegisterBlock::Data1.count(), 44);
        assert_eq!(RegisterBlock::Data2.address(), 45);
        assert_eq!(RegisterBlock::Data2.count(), 21);
        assert_eq!(RegisterBlock::Identity.register_type(), RegisterType::Holding);
        assert_eq!(RegisterBlock::Data2.register_type(), RegisterType::Input);
        assert_eq!(RegisterBlock::Data2.to_string(), "data2");
        assert_eq!(RegisterBlock::from(DataBlock::Data1), RegisterBlock::Data1);
        assert_eq!(RegisterBlock::from(DataBlock::Data2), RegisterBlock::Data2);
    }

    #[test]
    fn test_fields_fit_their_blocks() {
        for f in FIELDS {
            let width = match f.form {
                Form::Single => 1,
                Form::Double => 2,
            };
            let block = RegisterBlock::from(f.block);
            assert!(
                f.index + width <= usize::from(block.count()),
                "{} overruns {}",
                f.name,
                block
            );
        }
        assert!(INPUT_ENERGY_INDEX + 2 <= usize::from(RegisterBlock::Data2.count()));
        assert!(MODEL_CODE_HIGH + 2 <= usize::from(RegisterBlock::Identity.count()));
        assert!(
            SERIAL_NUMBER_START + SERIAL_NUMBER_REGISTERS
                <= usize::from(RegisterBlock::Identity.count())
        );
    }

    #[test]
    fn test_attribute_names_are_unique() {
        let names = attribute_names(InputEnergyKey::Total);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), 46);
        assert!(names.contains(&"input_energy_total"));
        assert!(!attribute_names(InputEnergyKey::Today).contains(&"input_energy_total"));
    }

    #[test]
    fn test_units() {
        assert_eq!(unit_of("input_power"), Some(WATT));
        assert_eq!(unit_of("frequency"), Some(HERTZ));
        assert_eq!(unit_of("operation_hours"), Some(HOURS));
        assert_eq!(unit_of("input_energy_today"), Some(KILO_WATT_HOUR));
        assert_eq!(unit_of("output_reactive_energy_total"), Some(KILO_VAR_HOUR));
        assert_eq!(unit_of("output_power_factor"), None);
        assert_eq!(unit_of("status"), None);
        assert_eq!(unit_of("nonsense"), None);
    }
}
