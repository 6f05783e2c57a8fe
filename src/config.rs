//! Configuration management for the Growatt driver

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::growatt::codes::UnknownCodePolicy;
use crate::growatt::registers::InputEnergyKey;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "GROWATT_CONFIG";
/// Configuration file used when none is given
pub const DEFAULT_CONFIG_FILE: &str = "growatt.yaml";
/// Prefix of environment overrides, e.g. `GROWATT_DEVICE__PORT`
pub const ENV_PREFIX: &str = "GROWATT";

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_UNIT_ID: u8 = 1;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
/// Longest accepted poll interval (one day)
pub const MAX_POLL_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;
/// Operation time register counts half-seconds; 7200 yields hours
pub const DEFAULT_OPERATION_HOURS_DIVISOR: f64 = 7200.0;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device settings
    pub device: DeviceConfig,
    /// Register interpretation
    pub decoding: DecodingConfig,
    /// Periodic polling
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port path (e.g., /dev/ttyUSB0)
    pub port: String,
    /// Modbus unit ID (1-247)
    pub unit_id: u8,
    /// Per-read timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    /// Divisor for the operation time counter
    pub operation_hours_divisor: f64,
    /// Key reported for the PV energy counter
    pub input_energy_key: InputEnergyKey,
    /// Handling of codes missing from the code tables
    pub unknown_codes: UnknownCodePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Poll interval in milliseconds; poll once when absent
    pub interval_ms: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            unit_id: DEFAULT_UNIT_ID,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            operation_hours_divisor: DEFAULT_OPERATION_HOURS_DIVISOR,
            input_energy_key: InputEnergyKey::default(),
            unknown_codes: UnknownCodePolicy::default(),
        }
    }
}

impl Config {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(1..=247).contains(&self.device.unit_id) {
            bail!(
                "Modbus unit id {} out of range (1-247)",
                self.device.unit_id
            );
        }
        if self.device.timeout_ms == 0 {
            bail!("Read timeout must be greater than zero");
        }
        let divisor = self.decoding.operation_hours_divisor;
        if !divisor.is_finite() || divisor <= 0.0 {
            bail!("Operation hours divisor must be positive, got {}", divisor);
        }
        if let Some(ms) = self.polling.interval_ms {
            if ms == 0 || ms > MAX_POLL_INTERVAL_MS {
                bail!(
                    "Poll interval must be between 1 and {} ms, got {}",
                    MAX_POLL_INTERVAL_MS,
                    ms
                );
            }
        }
        Ok(())
    }
}

/// Load configuration from file or use defaults
///
/// The file path comes from `path`, else `GROWATT_CONFIG`, else `growatt.yaml`.
/// An explicit `path` must exist; the fallback files may be absent.
/// Environment variables such as `GROWATT_DEVICE__PORT` override file values.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config_from(p, true),
        None => {
            let fallback = std::env::var(CONFIG_ENV)
                .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
            load_config_from(Path::new(&fallback), false)
        }
    }
}

fn load_config_from(config_path: &Path, required: bool) -> Result<Config> {
    let mut builder = ::config::Config::builder();

    if config_path.exists() {
        builder = builder.add_source(::config::File::from(config_path));
    } else if required {
        bail!("Config file {} not found", config_path.display());
    } else {
        tracing::warn!(
            "Config file {} not found, using defaults",
            config_path.display()
        );
    }

    let settings = builder
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let config: Config = settings
        .try_deserialize()
        .with_context(|| "Failed to parse config file")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.device.port, "/dev/ttyUSB0");
        assert_eq!(config.device.unit_id, 1);
        assert_eq!(config.device.timeout_ms, 1000);
        assert_eq!(config.decoding.operation_hours_divisor, 7200.0);
        assert_eq!(config.decoding.input_energy_key, InputEnergyKey::Total);
        assert_eq!(config.decoding.unknown_codes, UnknownCodePolicy::Label);
        assert_eq!(config.polling.interval_ms, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unit_id() {
        let mut config = Config::default();
        config.device.unit_id = 0;
        assert!(config.validate().is_err());
        config.device.unit_id = 248;
        assert!(config.validate().is_err());
        config.device.unit_id = 247;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_divisor_and_timeout() {
        let mut config = Config::default();
        config.decoding.operation_hours_divisor = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.polling.interval_ms = Some(0);
        assert!(config.validate().is_err());
        config.polling.interval_ms = Some(MAX_POLL_INTERVAL_MS + 1);
        assert!(config.validate().is_err());
        config.polling.interval_ms = Some(MAX_POLL_INTERVAL_MS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "device:\n  port: /dev/ttyS1\n  unit_id: 3\ndecoding:\n  operation_hours_divisor: 2\n  input_energy_key: today\n  unknown_codes: fail\npolling:\n  interval_ms: 30000"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.device.port, "/dev/ttyS1");
        assert_eq!(config.device.unit_id, 3);
        assert_eq!(config.device.timeout_ms, 1000);
        assert_eq!(config.decoding.operation_hours_divisor, 2.0);
        assert_eq!(config.decoding.input_energy_key, InputEnergyKey::Today);
        assert_eq!(config.decoding.unknown_codes, UnknownCodePolicy::Fail);
        assert_eq!(config.polling.interval_ms, Some(30000));
    }

    #[test]
    fn test_missing_fallback_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("growatt.yaml"), false).unwrap();
        assert_eq!(config.device.unit_id, DEFAULT_UNIT_ID);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
