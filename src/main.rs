//! DRM Proxy
//!
//! Relays license challenges from a browser player to the EZDRM license
//! service and media segments from a CDN origin.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────────┐
//!                        │                   DRM PROXY                    │
//!   Player               │  ┌──────────┐    ┌──────────┐   ┌───────────┐  │
//!   ─────────────────────┼─▶│  http    │───▶│ routing  │──▶│  license  │──┼──▶ EZDRM
//!   POST /license-proxy  │  │ server   │    │  table   │   └───────────┘  │
//!   GET  /stream/*       │  │ + layers │    │          │   ┌───────────┐  │
//!                        │  └──────────┘    │          │──▶│   media   │──┼──▶ CDN
//!   ◀────────────────────┼──── streamed ────┴──────────┘   └───────────┘  │
//!                        │                                                │
//!                        │  config · observability · resilience · net    │
//!                        └────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::net::TcpListener;

use drm_proxy::config::{load_config, LicenseScheme, ProxyConfig};
use drm_proxy::http::HttpServer;
use drm_proxy::lifecycle::Shutdown;
use drm_proxy::net::tls::load_tls_config;
use drm_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "drm-proxy")]
#[command(about = "License and media proxy for DRM-protected playback", long_about = None)]
struct Args {
    /// TOML configuration file. Environment variables override it.
    #[arg(short, long, env = "DRM_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = match load_config(args.config.as_deref(), args.bind.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("drm-proxy: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.check {
        println!("configuration OK");
        return ExitCode::SUCCESS;
    }

    logging::init_logging(&config.observability);

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("drm-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    for scheme in LicenseScheme::ALL {
        tracing::info!(
            scheme = %scheme,
            enabled = config.license.is_enabled(scheme),
            endpoint = %config.license.endpoint(scheme),
            "License route"
        );
    }
    tracing::info!(
        bind_address = %config.listener.bind_address,
        media = ?config.media.source,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    // Load TLS material before binding so a bad cert never serves traffic.
    let tls = match &config.listener.tls {
        Some(tls) => Some(load_tls_config(tls).await?),
        None => None,
    };

    let addr: SocketAddr = config.listener.bind_address.parse()?;
    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    match tls {
        Some(tls) => server.run_tls(addr, tls, shutdown.subscribe()).await?,
        None => {
            let listener = TcpListener::bind(addr).await?;
            server.run(listener, shutdown.subscribe()).await?
        }
    }

    Ok(())
}
