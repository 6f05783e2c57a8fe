//! Inverter identity and decoded snapshot types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identity read once from the holding registers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InverterIdentity {
    pub serial_number: String,
    pub model_number: String,
    pub firmware: String,
}

/// A decoded attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Scaled physical quantity
    Number(f64),
    /// Raw status, fault, warning or derating code
    Code(u16),
    /// Identity text or a code label
    Text(String),
}

/// Complete set of measurements from one successful poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InverterSnapshot {
    #[serde(flatten)]
    values: BTreeMap<&'static str, Value>,
    last_update: DateTime<Utc>,
}

impl InverterSnapshot {
    pub(crate) fn new(values: BTreeMap<&'static str, Value>, last_update: DateTime<Utc>) -> Self {
        Self {
            values,
            last_update,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Scaled quantity of a numeric attribute
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Raw code of a code attribute
    pub fn code(&self, name: &str) -> Option<u16> {
        match self.get(name)? {
            Value::Code(c) => Some(*c),
            _ => None,
        }
    }

    /// Text of an identity or label attribute
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Time the snapshot was committed
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InverterSnapshot {
        let mut values = BTreeMap::new();
        values.insert("input_power", Value::Number(150.0));
        values.insert("status_code", Value::Code(1));
        values.insert("status", Value::Text("Normal".to_string()));
        InverterSnapshot::new(values, DateTime::from_timestamp(0, 0).unwrap())
    }

    #[test]
    fn test_typed_accessors() {
        let snapshot = sample();
        assert_eq!(snapshot.number("input_power"), Some(150.0));
        assert_eq!(snapshot.code("status_code"), Some(1));
        assert_eq!(snapshot.text("status"), Some("Normal"));
        assert_eq!(snapshot.number("status"), None);
        assert_eq!(snapshot.text("missing"), None);
        assert_eq!(snapshot.len(), 3);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_serializes_flat() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["input_power"], 150.0);
        assert_eq!(json["status_code"], 1);
        assert_eq!(json["status"], "Normal");
        assert_eq!(json["last_update"], "1970-01-01T00:00:00Z");
    }
}
