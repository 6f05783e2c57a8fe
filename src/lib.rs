//! Growatt RS232 - Growatt PV inverter driver
//!
//! Polls a Growatt inverter over a serial Modbus RTU link and decodes its
//! registers into named, scaled measurements.
//!
//! ```no_run
//! use growatt_rs232::config::Config;
//! use growatt_rs232::growatt::GrowattInverter;
//! use growatt_rs232::modbus::RtuTransport;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let mut inverter = GrowattInverter::new(RtuTransport::new(&config.device), &config);
//! let snapshot = inverter.update().await?;
//! println!("{:?} W", snapshot.number("output_power"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod growatt;
pub mod modbus;

pub use error::GrowattError;
pub use growatt::{GrowattInverter, InverterIdentity, InverterSnapshot, Value};
