//! Server loop and startup information.

use std::env;
use std::future::Future;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::connection::{Admission, ConnectionLimiter};
use crate::{args::Args, env_vars};
use openrelay_core::{ConfigProvider, ProxyState, Transport, handle_request};

/// How long in-flight connections may keep running after shutdown starts.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// Each connection is served as HTTP/1.1 on its own task. Connections over
/// the `connections` limit are closed immediately. Once `shutdown` resolves
/// no new connections are accepted and in-flight ones get
/// [`SHUTDOWN_GRACE_PERIOD`] to finish.
///
/// # Errors
///
/// Only returns an error if the listener's local address cannot be read;
/// failed `accept` calls are logged and skipped.
pub async fn run<C, T, F>(
    listener: TcpListener,
    state: ProxyState<C, T>,
    connections: ConnectionLimiter,
    shutdown: F,
) -> std::io::Result<()>
where
    C: ConfigProvider + 'static,
    T: Transport,
    F: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "OpenRelay listening");

    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(error = %err, "Failed to accept connection");
                    continue;
                }
            },
            () = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                break;
            }
        };

        let permit = connections.admit();
        if let Admission::Rejected = permit {
            warn!(
                client = %peer,
                max = connections.max_connections(),
                "Connection limit reached, dropping connection"
            );
            continue;
        }

        debug!(client = %peer, "New connection");

        let state = state.clone();
        let service = service_fn(move |req| handle_request(req, peer, state.clone()));
        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        let conn = graceful.watch(conn);

        tokio::spawn(async move {
            // Held for the lifetime of the connection.
            let _permit = permit;
            if let Err(err) = conn.await {
                debug!(client = %peer, error = %err, "Connection error");
            }
        });
    }

    tokio::select! {
        () = graceful.shutdown() => {
            info!("All connections closed");
        }
        () = tokio::time::sleep(SHUTDOWN_GRACE_PERIOD) => {
            warn!(
                timeout_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
                "Shutdown grace period elapsed, closing remaining connections"
            );
        }
    }

    Ok(())
}

/// Print startup banner with configuration
pub fn print_startup_info<C: ConfigProvider>(args: &Args, config: &C, max_connections: usize) {
    if args.quiet {
        // Quiet mode: only essential information
        println!(
            "🚀 OpenRelay v{} starting on {}:{}",
            config.version(),
            args.bind,
            args.listen
        );
        return;
    }

    // Normal/verbose mode: full configuration display
    println!("🛰️  {} v{}", env!("CARGO_PKG_NAME"), config.version());
    println!("   {}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("📡 Network Configuration:");
    println!("   Listen:         {}:{}", args.bind, args.listen);
    match max_connections {
        0 => println!("   Connections:    unlimited"),
        n => println!("   Connections:    {} max", n),
    }
    if let Some(origin) = &config.proxy_config().public_origin {
        println!("   Public Origin:  {}", origin);
    }
    println!();

    let rate_config = config.rate_limit_config();
    println!("⚡ Rate Limiting:");
    if rate_config.enabled {
        println!(
            "   Max Requests:   {} per {} seconds",
            rate_config.max_requests,
            rate_config.window_duration.as_secs()
        );
    } else {
        println!("   Disabled");
    }

    let cache_config = config.cache_config();
    println!("🗄️  Response Cache:");
    if cache_config.enabled {
        println!("   TTL:            {} seconds", cache_config.ttl.as_secs());
        println!(
            "   Mode:           {}",
            if cache_config.cache_everything {
                "cache everything"
            } else {
                "respect upstream cache headers"
            }
        );
    } else {
        println!("   Disabled");
    }

    let proxy_config = config.proxy_config();
    println!("🔧 Proxy Configuration:");
    println!("   Timeout:        {} seconds", proxy_config.timeout.as_secs());
    println!("   Max Body Size:  {} MB", proxy_config.max_body_size_mb());

    print_security_config(config);

    // Show environment configuration in verbose mode
    if args.verbose {
        print_env_config();
    }

    println!();
    println!("🚀 Server starting...");
}

/// Print security configuration summary
fn print_security_config<C: ConfigProvider>(config: &C) {
    println!("🔒 Security Configuration:");

    if config.is_auth_enabled() {
        println!("   Auth:           shared secret in '{}'", config.api_key_header());
    } else {
        println!("   Auth:           disabled (open relay)");
    }

    match config.trusted_proxy_ips() {
        Some(ips) => println!("   Client IP:      from headers of {} trusted proxies", ips.len()),
        None => println!("   Client IP:      TCP peer address"),
    }

    let blocked = config.blocked_hosts();
    if blocked.is_empty() {
        println!("   Blocked Hosts:  none configured");
    } else {
        println!("   Blocked Hosts:  {}", blocked.join(", "));
    }
}

/// Print environment variable configuration status (used in verbose mode)
fn print_env_config() {
    println!();
    println!("🔧 Environment Variables:");

    for &var_name in env_vars::all_env_vars() {
        match env::var(var_name) {
            Ok(value) => {
                // Mask sensitive values
                let display_value = if env_vars::is_sensitive(var_name) {
                    "[CONFIGURED]".to_string()
                } else {
                    value
                };
                println!("   {:<25} = {}", var_name, display_value);
            }
            Err(_) => {
                println!("   {:<25} = [NOT SET]", var_name);
            }
        }
    }
}
