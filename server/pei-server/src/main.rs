use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pei_server::{create_app, EngineConfig, PeiCollabServer};

/// PEI Collab Engine HTTP Server
#[derive(Parser, Debug)]
#[command(name = "pei-server")]
#[command(about = "Versioned PEI records with audit trail and family access tokens")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    info!("Starting PEI Collab Engine server");
    info!(version = env!("CARGO_PKG_VERSION"), "build");

    let config = EngineConfig::from_env();
    info!(?config, "engine configuration loaded");

    let server = PeiCollabServer::new(config);
    if let Some(superadmin_id) = server.seed_bootstrap() {
        info!(%superadmin_id, "fresh directory; bootstrap superadmin created");
    }

    let app = create_app(server);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!("PEI Collab Engine server running on http://{addr}");
    info!("Health check available at: http://{addr}/health");

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "pei_server=debug,tower_http=debug"
    } else {
        "pei_server=info,tower_http=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    let is_development =
        std::env::var("PEI_ENV").unwrap_or_else(|_| "development".to_string()) == "development";

    if is_development {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    } else {
        // Structured JSON logging for production.
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).json())
            .init();
    }
}
