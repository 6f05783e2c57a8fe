//! Status, fault, warning and derating code tables
//!
//! Labels follow the Growatt PV Inverter Modbus RS485 RTU Protocol V3.14.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

const STATUS_CODES: &[(u16, &str)] = &[(0, "Waiting"), (1, "Normal"), (3, "Fault")];

const FAULT_CODES: &[(u16, &str)] = &[
    (0, "None"),
    (24, "Auto Test Failed"),
    (25, "No AC Connection"),
    (26, "PV Isolation Low"),
    (27, "Residual I High"),
    (28, "Output High DCI"),
    (29, "PV Voltage High"),
    (30, "AC V Outrange"),
    (31, "AC F Outrange"),
    (32, "Module Hot"),
];

/// Fault codes 1..=23 are reported as generic error codes 100..=122.
const GENERIC_FAULT_CODES: std::ops::RangeInclusive<u16> = 1..=23;
const GENERIC_FAULT_OFFSET: u16 = 99;

// Bits 0x0400..=0x8000 are reserved and carry no label.
const WARNING_CODES: &[(u16, &str)] = &[
    (0x0000, "None"),
    (0x0001, "Fan warning"),
    (0x0002, "String communication abnormal"),
    (0x0004, "StrPID config Warning"),
    (0x0008, "Fail to read EEPROM"),
    (0x0010, "DSP and COM firmware unmatch"),
    (0x0020, "Fail to write EEPROM"),
    (0x0040, "SPD abnormal"),
    (0x0080, "GND and N connect abnormal"),
    (0x0100, "PV1 or PV2 circuit short"),
    (0x0200, "PV1 or PV2 boost driver broken"),
    (0x0400, ""),
    (0x0800, ""),
    (0x1000, ""),
    (0x2000, ""),
    (0x4000, ""),
    (0x8000, ""),
];

// Code 0 reads "No Derating"; older Growatt drivers spell it "No Deratring".
const DERATING_MODES: &[(u16, &str)] = &[
    (0, "No Derating"),
    (1, "PV"),
    (2, ""),
    (3, "Vac"),
    (4, "Fac"),
    (5, "Tboost"),
    (6, "Tinv"),
    (7, "Control"),
    (8, "*LoadSpeed"),
    (9, "*OverBackByTime"),
];

/// One of the fixed code tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeTable {
    Status,
    Fault,
    Warning,
    Derating,
}

impl CodeTable {
    /// Label for `code`, or `None` when the table has no entry.
    pub fn lookup(self, code: u16) -> Option<Cow<'static, str>> {
        if self == CodeTable::Fault && GENERIC_FAULT_CODES.contains(&code) {
            return Some(Cow::Owned(format!(
                "Generic Error Code: {}",
                GENERIC_FAULT_OFFSET + code
            )));
        }

        let entries = match self {
            CodeTable::Status => STATUS_CODES,
            CodeTable::Fault => FAULT_CODES,
            CodeTable::Warning => WARNING_CODES,
            CodeTable::Derating => DERATING_MODES,
        };

        entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| Cow::Borrowed(*label))
    }

    /// Table name as used in errors and logs
    pub fn name(self) -> &'static str {
        match self {
            CodeTable::Status => "status",
            CodeTable::Fault => "fault",
            CodeTable::Warning => "warning",
            CodeTable::Derating => "derating",
        }
    }
}

impl fmt::Display for CodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with a code that has no table entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCodePolicy {
    /// Report `Unknown(<code>)` as the label
    #[default]
    Label,
    /// Fail the update with `UnknownCode`
    Fail,
}

/// Label used for codes outside the table
pub fn unknown_label(code: u16) -> String {
    format!("Unknown({})", code)
}
