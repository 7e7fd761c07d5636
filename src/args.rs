//! Command line argument parsing for OpenRelay.
//!
//! This module defines the CLI interface using [`clap`] for argument parsing.
//! Network settings come from flags; everything about proxy behavior comes
//! from environment variables (see [`crate::env_vars`]).
//!
//! # Example
//!
//! ```no_run
//! use openrelay::args::Args;
//! use clap::Parser;
//!
//! let args = Args::parse();
//! if let Err(e) = args.validate() {
//!     eprintln!("Configuration error: {}", e);
//!     std::process::exit(1);
//! }
//! ```

use std::net::{IpAddr, SocketAddr};

use clap::Parser;

/// Command line arguments for OpenRelay.
///
/// # Fields
///
/// * `bind` - Address to listen on (default: "0.0.0.0")
/// * `listen` - Port to listen on (default: 8080)
/// * `verbose` - Enable detailed configuration output and debug logs
/// * `quiet` - Suppress non-essential output (conflicts with verbose)
/// * `json_logs` - Output logs in JSON format for structured logging
#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(
    long_about = "A stateless CORS and forward proxy gateway\nFetches public URLs on behalf of callers, adds permissive CORS headers and keeps links and redirects on the gateway\n\nExample usage:\n  openrelay --listen 8080\n  SECRET=s3cret openrelay -b 127.0.0.1 -l 3000 --json-logs"
)]
#[command(
    after_help = "Environment variables:\n  SECRET                 Shared secret required in the API key header\n  API_KEY_HEADER         Header carrying the secret (default: x-api-key)\n  RATE_LIMIT_REQUESTS    Max requests per window (default: 100)\n  RATE_LIMIT_WINDOW_SECS Rate limit window seconds (default: 60)\n  BLOCKED_HOSTS          Comma-separated blocked hosts and prefixes\n  TRUSTED_PROXY_IPS      Peers whose client IP headers are trusted\n  PUBLIC_ORIGIN          Externally visible origin, e.g. https://relay.example.org\n\nRun with --verbose to list every supported variable."
)]
pub struct Args {
    /// Address to bind to
    #[arg(
        long,
        short = 'b',
        help = "Bind address for incoming connections",
        value_name = "ADDRESS",
        default_value = "0.0.0.0"
    )]
    pub bind: String,

    /// Port to listen on for incoming requests
    #[arg(
        long,
        short = 'l',
        help = "Listen port for incoming connections",
        value_name = "PORT",
        default_value_t = 8080
    )]
    pub listen: u16,

    /// Enable verbose output
    #[arg(
        long,
        short = 'v',
        help = "Show detailed configuration and enable debug logs"
    )]
    pub verbose: bool,

    /// Enable quiet mode (minimal output)
    #[arg(
        long,
        short = 'q',
        help = "Suppress configuration output, log warnings and errors only",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output logs in JSON format (for structured logging)
    #[arg(long, help = "Output logs in JSON format for structured logging")]
    pub json_logs: bool,
}

impl Args {
    /// Validates the parsed command line arguments.
    ///
    /// - The listen port must be greater than 0
    /// - The bind address must be a valid IP address
    ///
    /// # Example
    ///
    /// ```
    /// use openrelay::args::Args;
    /// use clap::Parser;
    ///
    /// let args = Args::try_parse_from(["openrelay", "-l", "0"]).unwrap();
    /// assert!(args.validate().is_err());
    ///
    /// let args = Args::try_parse_from(["openrelay", "-l", "8080"]).unwrap();
    /// assert!(args.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), String> {
        if self.listen == 0 {
            return Err("Listen port must be greater than 0".to_string());
        }

        if self.bind.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind address: '{}'", self.bind));
        }

        Ok(())
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns an error message if the bind address is not an IP address.
    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|_| format!("Invalid bind address: '{}'", self.bind))?;
        Ok(SocketAddr::from((ip, self.listen)))
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}
