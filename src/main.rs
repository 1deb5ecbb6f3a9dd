//! Cinder server
//!
//! Serves the built Cinder SPA and reverse-proxies its FHIR REST calls to
//! Cloud Healthcare API FHIR stores.
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!   Browser request      │  request id → trace → security headers       │
//!   ─────────────────────┼─▶ dispatch                                   │
//!                        │     │                                        │
//!                        │     ├─ /fhir/* ─▶ store base allow-list ─────┼──▶ FHIR store
//!                        │     │             query rewrite, relay       │
//!                        │     │                                        │
//!                        │     └─ else ───▶ static file / SPA entry     │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cinder_server::config::loader::read_config;
use cinder_server::config::validation::validate_config;
use cinder_server::config::{ConfigError, LogFormat, ServerConfig};
use cinder_server::lifecycle::{signals, Shutdown};
use cinder_server::observability::{logging, metrics};
use cinder_server::HttpServer;

#[derive(Parser)]
#[command(name = "cinder-server")]
#[command(about = "Serves the Cinder SPA and proxies FHIR calls to Cloud Healthcare API stores", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "CINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port (overrides the config file).
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Directory holding the built SPA.
    #[arg(short, long)]
    dist_dir: Option<String>,

    /// Log output format.
    #[arg(long, value_parser = ["pretty", "json"])]
    log_format: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.set_port(port);
        }
        if let Some(dist_dir) = self.dist_dir {
            config.static_files.content_root = dist_dir;
        }
        match self.log_format.as_deref() {
            Some("json") => config.observability.log_format = LogFormat::Json,
            Some("pretty") => config.observability.log_format = LogFormat::Pretty,
            _ => {}
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability);

    tracing::info!("cinder-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        content_root = %config.static_files.content_root,
        upstream_timeout_secs = config.proxy.upstream_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            signals::wait_for_shutdown().await;
            shutdown.trigger();
        }
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
