//! Command-line arguments
//!
//! `authed-fetch [--config PATH] [--metrics] METHOD PATH [BODY]`

use clap::Parser;
use reqwest::Method;

/// Send one authenticated request and print the response body.
#[derive(Debug, Parser)]
#[command(name = "authed-fetch", version)]
pub struct Invocation {
    /// Config file (default: $CONFIG_PATH, then ./authed-fetch.toml)
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<String>,

    /// Print Prometheus counters to stderr after the request
    #[arg(long = "metrics")]
    pub print_metrics: bool,

    /// HTTP method, case-insensitive
    #[arg(value_parser = parse_method)]
    pub method: Method,

    /// Request path, joined onto the upstream base URL
    pub path: String,

    /// JSON body sent as-is
    pub body: Option<String>,
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method {raw}"))
}
