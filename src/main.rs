mod bridge;
mod config;
mod dispatcher;
mod panel;
mod resolver;
mod session;
mod switch_panel;
#[cfg(test)]
mod testing;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};

use bridge::ReconnectPolicy;
use config::{LogLevel, Settings};
use dispatcher::HttpDispatcher;
use panel::PanelDefinition;
use session::PanelSession;
use switch_panel::{DeviceError, SwitchPanel};

const HTTP_WORKER_THREADS: usize = 2;

/// Drive the FlightGear property tree from a Saitek Pro Flight Switch Panel
#[derive(Parser, Debug)]
#[command(name = "switch-panel-bridge")]
#[command(version)]
struct Args {
    /// Log level
    #[arg(long = "loglevel", value_enum, default_value_t = LogLevel::Error)]
    log_level: LogLevel,

    /// YAML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host of the simulator's HTTP property server
    #[arg(long)]
    host: Option<String>,

    /// Port of the simulator's HTTP property server
    #[arg(long)]
    port: Option<u16>,

    /// USB product string of the panel
    #[arg(long, value_name = "NAME")]
    product: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(args.log_level))
        .with_target(false)
        .init();

    let settings = settings(&args)?;
    let panel = PanelDefinition::switch_panel().context("invalid switch panel layout")?;

    let device = match SwitchPanel::connect(&settings.product_name, settings.read_timeout()) {
        Ok(device) => {
            info!("{} was found as a connected HID device", device.product());
            device
        }
        Err(err @ DeviceError::NotFound(_)) => {
            error!("{err}");
            return Ok(());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open {}", settings.product_name))
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(HTTP_WORKER_THREADS)
        .thread_name("switch-panel-http")
        .enable_all()
        .build()
        .context("failed to start HTTP runtime")?;
    let dispatcher = HttpDispatcher::new(settings.base_url(), runtime.handle().clone())
        .context("failed to build HTTP client")?;
    info!(url = %settings.base_url(), "sending property updates");

    let mut session = PanelSession::new(panel);
    let policy = ReconnectPolicy::from(&settings.reconnect);
    let product_name = settings.product_name.clone();
    let timeout = settings.read_timeout();

    bridge::run(
        device,
        || SwitchPanel::connect(&product_name, timeout),
        &mut session,
        &dispatcher,
        &policy,
    )
    .with_context(|| format!("lost connection to {product_name}"))
}

fn settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(host) = &args.host {
        settings.simulator.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.simulator.port = port;
    }
    if let Some(product) = &args.product {
        settings.product_name = product.clone();
    }

    Ok(settings)
}
