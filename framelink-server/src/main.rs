//! framelink echo server entry point.
//!
//! ```text
//! framelink-server                  Listen with defaults (port 31000)
//! framelink-server --port <n>       Override the listen port
//! framelink-server --config <path>  Load a custom config TOML
//! framelink-server --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use framelink_core::signal;
use framelink_server::config::EchoConfig;
use framelink_server::service::EchoService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framelink-server", about = "framelink demo echo server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framelink-server.toml")]
    config: PathBuf,

    /// Listen port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.gen_config {
        return match toml::to_string_pretty(&EchoConfig::default()) {
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

    let mut config = EchoConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.server.listen_port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("framelink-server v{}", env!("CARGO_PKG_VERSION"));
    info!("port: {}", config.server.listen_port);
    info!("max clients: {}", config.server.max_clients);

    signal::install_shutdown_handler();

    let mut service = match EchoService::bind(config) {
        Ok(service) => service,
        Err(err) => {
            error!(%err, "failed to start server");
            return ExitCode::FAILURE;
        }
    };

    match service.run() {
        Ok(stats) => {
            info!(
                accepted = stats.accepted,
                rejected = stats.rejected,
                closed = stats.closed,
                dropped = stats.dropped_packets,
                "shutdown server properly"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "server stopped");
            ExitCode::FAILURE
        }
    }
}
