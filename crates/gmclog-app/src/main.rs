//! gmclog - GMC Geiger counter logger
//!
//! Opens the detector's serial port, identifies it, then polls count rate,
//! battery voltage and clock on fixed intervals until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gmclog_core::prelude::*;
use gmclog_core::protocol::{first_port, list_ports, PORT_OPEN_SETTLE};

/// Default log file
const DEFAULT_OUTPUT: &str = "geiger_log.csv";

/// Default location label written with every record
const DEFAULT_LOCATION: &str = "53.4096, -2.5737";

/// gmclog CLI
#[derive(Parser, Debug)]
#[command(name = "gmclog", version, about = "Log GMC Geiger counter readings", long_about = None)]
struct Cli {
    /// Serial port to use (default: first port found)
    #[arg(short, long)]
    port: Option<String>,

    /// Record log; `.jsonl` selects JSON lines, anything else CSV
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Location label stored with each record
    #[arg(short, long, default_value = DEFAULT_LOCATION)]
    location: String,

    /// Verbose output (raw replies, debug logging)
    #[arg(short, long)]
    verbose: bool,

    /// Talk to a simulated detector instead of a serial port
    #[arg(long)]
    demo: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}

/// Open the configured port, or the first one enumerated.
///
/// Returns `None` when no port exists at all.
fn open_device(cli: &Cli) -> anyhow::Result<Option<Box<dyn DeviceChannel>>> {
    if cli.demo {
        tracing::info!("Using simulated detector");
        return Ok(Some(Box::new(SimulatedDetector::new())));
    }

    let port_name = match &cli.port {
        Some(name) => name.clone(),
        None => match first_port() {
            Ok(info) => info.name,
            Err(ProtocolError::PortNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        },
    };

    tracing::info!("Using serial port: {port_name}");
    let channel = open_channel(&ConnectionConfig::new(port_name.as_str()))
        .with_context(|| format!("failed to open serial port {port_name}"))?;
    Ok(Some(Box::new(channel)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::info!("Starting gmclog v{}", gmclog_core::VERSION);

    if cli.list_ports {
        for port in list_ports() {
            let usb_id = match (port.vid, port.pid) {
                (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
                _ => "-".to_string(),
            };
            println!(
                "{}\t{}\t{}",
                port.name,
                usb_id,
                port.product.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    let sink = gmclog_core::datalog::open_sink(&cli.output)
        .with_context(|| format!("failed to open record log {}", cli.output.display()))?;

    let Some(channel) = open_device(&cli)? else {
        tracing::warn!("No serial port found. Ensure the device is connected.");
        return Ok(());
    };

    if !cli.demo {
        tokio::time::sleep(PORT_OPEN_SETTLE).await;
    }

    let session = Arc::new(DeviceSession::new(
        channel,
        SessionConfig {
            verbose: cli.verbose,
        },
    ));
    let identity = session
        .identify()
        .await
        .context("failed to identify device")?;
    tracing::info!("Device version: {}", identity.version);
    tracing::info!("Device serial number: {}", identity.serial);

    let handles = PollScheduler::new(session, identity, cli.location).spawn(sink);

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;
    tracing::info!("Interrupted, stopping");
    handles.abort();
    Ok(())
}
