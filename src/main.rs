//! CLI Entry Point for pslab-probe
//!
//! Opens a serial port, queries the device's version identifier and checks it
//! against the expected prefix.
//!
//! # Usage
//!
//! ```bash
//! pslab-probe --port /dev/ttyACM0
//! pslab-probe --config config/pslab.toml --timeout-ms 1000
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use pslab_protocol::config::{PslabConfig, DEFAULT_CONFIG_PATH};
use pslab_protocol::{tracing_setup, ProtocolEngine, SerialTransport};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "pslab-probe")]
#[command(about = "Query and verify the firmware version of a PSLab device", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial port, overrides the configured one
    #[arg(long)]
    port: Option<String>,

    /// Baud rate, overrides the configured one
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Protocol timeout in milliseconds, overrides the configured one
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PslabConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(port) = cli.port {
        config.serial.port = port;
    }
    if let Some(baud_rate) = cli.baud_rate {
        config.serial.baud_rate = baud_rate;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.protocol.timeout_ms = timeout_ms;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    tracing_setup::init_from_config(&config).map_err(|e| anyhow!(e))?;

    let transport = SerialTransport::open(&config.serial.port, config.serial.baud_rate)
        .with_context(|| format!("Failed to open serial port '{}'", config.serial.port))?;
    let mut engine = ProtocolEngine::from_config(transport, &config.protocol);

    engine
        .verify_version(&config.protocol.expected_version)
        .context("Version check failed")?;

    info!(version = engine.version(), port = %config.serial.port, "Device ready");
    println!("{}", engine.version());
    Ok(())
}
