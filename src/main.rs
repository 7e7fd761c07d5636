use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use openrelay::args::Args;
use openrelay::connection::ConnectionLimiter;
use openrelay::{config, server};
use openrelay_core::{AuthenticationProvider, HttpTransport, ProxyState};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(err) = args.validate() {
        eprintln!("❌ Configuration error: {err}");
        std::process::exit(1);
    }

    init_tracing(&args);

    let config = config::get_config();
    let max_connections = config::get_max_connections();
    server::print_startup_info(&args, config, max_connections);

    if !config.is_auth_enabled() {
        warn!("No SECRET configured, the gateway accepts unauthenticated requests");
    }

    let transport = match HttpTransport::new(&config.proxy, &config.cache) {
        Ok(transport) => transport,
        Err(err) => {
            error!(error = %err, "Failed to create HTTP client");
            std::process::exit(1);
        }
    };

    let bind_addr = match args.listen_addr() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("❌ Configuration error: {err}");
            std::process::exit(1);
        }
    };
    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("❌ Failed to bind to {bind_addr}: {err}");
            std::process::exit(1);
        }
    };

    let state = ProxyState::new(
        Arc::new(config.clone()),
        Arc::new(transport),
        &bind_addr.to_string(),
    );

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    if let Err(err) = server::run(
        listener,
        state,
        ConnectionLimiter::new(max_connections),
        shutdown,
    )
    .await
    {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.default_log_filter()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}
