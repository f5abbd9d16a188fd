//! framelink demo client entry point.
//!
//! ```text
//! framelink-client                    Connect to 127.0.0.1:31000
//! framelink-client <address>          Connect to another server
//! framelink-client --config <path>    Use custom config TOML
//! framelink-client --gen-config       Dump default config and exit
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use framelink_core::signal;
use framelink_client::config::ClientAppConfig;
use framelink_client::session::Session;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framelink-client", about = "framelink demo client")]
struct Cli {
    /// Server address (overrides config).
    server: Option<String>,

    /// Server port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framelink-client.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.gen_config {
        return match toml::to_string_pretty(&ClientAppConfig::default()) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to render default config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let mut config = ClientAppConfig::load(&cli.config);
    if let Some(server) = cli.server {
        config.client.server_address = server;
    }
    if let Some(port) = cli.port {
        config.client.server_port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("framelink-client v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "server: {}:{}",
        config.client.server_address, config.client.server_port
    );

    signal::install_shutdown_handler();

    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(err) => {
            error!(%err, "failed to create client");
            return ExitCode::FAILURE;
        }
    };
    session.run();

    let meter = session.meter();
    info!(
        received = meter.total_received(),
        sent = meter.total_sent(),
        "client stopped"
    );
    ExitCode::SUCCESS
}
