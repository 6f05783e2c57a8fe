//! Growatt RS232 command line poller

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use growatt_rs232::config::{self, Config};
use growatt_rs232::growatt::GrowattInverter;
use growatt_rs232::modbus::{reader, RtuTransport};

/// Read measurements from a Growatt inverter over RS232 / Modbus RTU
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Serial device of the RS232 converter
    port: Option<String>,

    /// Modbus address of the inverter (1-247)
    address: Option<u8>,

    /// Configuration file (default: $GROWATT_CONFIG or growatt.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll every SECS seconds instead of once
    #[arg(short, long, value_name = "SECS")]
    interval: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.device.port = port.clone();
        }
        if let Some(address) = self.address {
            config.device.unit_id = address;
        }
        if let Some(secs) = self.interval {
            config.polling.interval_ms = Some(secs.saturating_mul(1000));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate().with_context(|| "Invalid configuration")?;

    let transport = RtuTransport::new(&config.device);
    let mut inverter = GrowattInverter::new(transport, &config);

    match config.polling.interval_ms {
        Some(ms) => {
            tokio::select! {
                _ = reader::start_polling(&mut inverter, Duration::from_millis(ms), print_json_line) => {}
                _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, stopping"),
            }
        }
        None => {
            let snapshot = inverter
                .update()
                .await
                .with_context(|| format!("Failed to read inverter on {}", config.device.port))?;
            let json = serde_json::to_string_pretty(snapshot)?;
            if let Some(identity) = inverter.identity() {
                println!(
                    "Model: {} Serial = {} firmware = {}",
                    identity.model_number, identity.serial_number, identity.firmware
                );
            }
            println!("Sensors data: {}", json);
            if let Some(last_update) = inverter.last_update() {
                println!("Last update: {}", last_update);
            }
        }
    }

    Ok(())
}

fn print_json_line(snapshot: &growatt_rs232::InverterSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::error!("Failed to serialize snapshot: {}", e),
    }
}
