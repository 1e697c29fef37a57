//! NextGCore UDM (Unified Data Management)
//!
//! The UDM is a 5G core network function responsible for:
//! - UE context management (AMF/SMF/SMSF registration)
//! - Event exposure subscriptions
//! - Data change and deregistration notifications

use anyhow::{Context, Result};
use clap::Parser;
use nextgcore_udmd::{
    udm_sbi_request_handler, NotificationClient, SbiNotificationClient, UdmConfig, UdmServices,
};
use ogs_sbi::oauth::OAuth2Client;
use ogs_sbi::server::{SbiServer, SbiServerConfig};
use ogs_sbi::types::NfType;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// NextGCore UDM - Unified Data Management
#[derive(Parser, Debug)]
#[command(name = "nextgcore-udmd")]
#[command(author = "NextGCore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "5G Core Unified Data Management", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, default_value = "/etc/nextgcore/udm.yaml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'e', long, default_value = "info")]
    log_level: String,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,

    /// SBI server address (overrides udm.sbi.address)
    #[arg(long)]
    sbi_addr: Option<String>,

    /// SBI server port (overrides udm.sbi.port)
    #[arg(long)]
    sbi_port: Option<u16>,

    /// Maximum number of UEs (overrides udm.max_ue)
    #[arg(long)]
    max_ue: Option<usize>,
}

impl Args {
    /// Apply command line overrides on top of the file configuration
    fn apply(&self, config: &mut UdmConfig) {
        if let Some(addr) = &self.sbi_addr {
            config.sbi.address = addr.clone();
        }
        if let Some(port) = self.sbi_port {
            config.sbi.port = port;
        }
        if let Some(max_ue) = self.max_ue {
            config.max_ue = max_ue;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    log::info!("NextGCore UDM v{} starting...", env!("CARGO_PKG_VERSION"));

    // Set up signal handlers
    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    // Load configuration
    let mut config = UdmConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration {}", args.config))?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    // Initialize UDM context
    let context = Arc::new(config.build_context().context("Failed to build UDM context")?);
    log::info!(
        "UDM context initialized (max_ue={}, nf_instance_id={})",
        config.max_ue,
        config.nf_instance_id
    );

    // Outbound notifications, with NRF tokens when an NRF is configured
    let oauth = match &config.nrf {
        Some(nrf) => Some(
            OAuth2Client::new(nrf, config.nf_instance_id.clone(), NfType::Udm)
                .map_err(|e| anyhow::anyhow!("Invalid NRF URI {}: {}", nrf, e))?,
        ),
        None => None,
    };
    let notifier: Arc<dyn NotificationClient> = Arc::new(SbiNotificationClient::new(oauth));
    let services = Arc::new(UdmServices::new(context, notifier));

    // Start HTTP/2 SBI server
    let sbi_config = SbiServerConfig::with_host_port(&config.sbi.address, config.sbi.port)
        .map_err(|e| anyhow::anyhow!("Invalid SBI address: {}", e))?;
    let sbi_server = SbiServer::new(sbi_config);

    let sbi_addr = sbi_server
        .start(move |request| udm_sbi_request_handler(services.clone(), request))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start SBI server: {}", e))?;

    log::info!("SBI HTTP/2 server listening on {}", sbi_addr);
    log::info!("NextGCore UDM ready");

    run_until_shutdown(shutdown).await;

    // Graceful shutdown
    log::info!("Shutting down...");

    sbi_server
        .stop()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to stop SBI server: {}", e))?;
    log::info!("SBI HTTP/2 server stopped");

    log::info!("NextGCore UDM stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    builder.filter_level(level);
    builder.format_timestamp_millis();

    if args.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.try_init().context("Failed to initialize logger")?;

    Ok(())
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    Ok(())
}

/// Wait for the shutdown flag
async fn run_until_shutdown(shutdown: Arc<AtomicBool>) {
    log::debug!("Entering main loop");

    let mut interval = tokio::time::interval(Duration::from_millis(100));
    while !shutdown.load(Ordering::SeqCst) {
        interval.tick().await;
    }

    log::debug!("Exiting main loop");
}
