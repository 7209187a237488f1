//! authed-fetch
//!
//! One-shot authenticated HTTP client:
//! 1. Loads the session from the credential file (seeded from env if set)
//! 2. Sends one request with the bearer token attached
//! 3. Refreshes and replays transparently on a stale-credential response
//! 4. Prints the response body to stdout

mod cli;
mod config;
mod drain;
mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use auth_runtime::{AuthClient, RedirectTerminator, StatusPolicy};
use auth_session::{CredentialKey, CredentialStore, FileStore, HttpLogout, HttpRefresher};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{HttpRequest, ReqwestTransport};

use crate::cli::Invocation;
use crate::config::{AuthConfig, Config};
use crate::drain::{DRAIN_TIMEOUT, DrainingTerminator};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
    // Logs go to stderr; stdout carries the response body.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let invocation = Invocation::parse();
    let prometheus = if invocation.print_metrics {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let config_path = Config::resolve_path(invocation.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        base_url = %config.upstream.base_url,
        refresh_url = %config.auth.refresh_url,
        timeout_secs = config.upstream.timeout_secs,
        "configuration loaded"
    );

    let store = FileStore::load(config.auth.credentials_path.clone()).with_context(|| {
        format!(
            "failed to load credentials from {}",
            config.auth.credentials_path.display()
        )
    })?;
    seed_store(&store, &config.auth)?;
    let store = Arc::new(store);

    // Token authority calls use their own client so they never pass through
    // the authenticated runtime.
    let authority = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream.timeout_secs))
        .build()
        .context("failed to build token authority client")?;

    let mut redirect = RedirectTerminator::new(config.auth.login_redirect.clone());
    if let Some(ref logout_url) = config.auth.logout_url {
        redirect = redirect.with_logout(HttpLogout::new(authority.clone(), logout_url.clone()));
    }
    let terminator = Arc::new(DrainingTerminator::new(Arc::new(redirect)));

    let transport = ReqwestTransport::new(reqwest::Client::new(), config.upstream.base_url.clone())
        .with_timeout(Duration::from_secs(config.upstream.timeout_secs));

    let policy = StatusPolicy::from_codes(
        config.auth.unauthenticated_status,
        config.auth.stale_credential_status,
    )?;

    let client = AuthClient::builder()
        .transport(Arc::new(transport))
        .store(store)
        .refresher(Arc::new(HttpRefresher::new(
            authority,
            config.auth.refresh_url.clone(),
        )))
        .terminator(terminator.clone())
        .status_policy(policy)
        .build()?;

    let request = build_request(&invocation);
    let outcome = client.execute(request).await;

    // let a detached session termination start, then wait for it
    tokio::task::yield_now().await;
    terminator.drain(DRAIN_TIMEOUT).await;

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }

    let response = outcome.context("request failed")?;
    println!("{}", response.text());
    Ok(())
}

/// Write tokens from the environment into the store, replacing stored ones.
fn seed_store(store: &dyn CredentialStore, auth: &AuthConfig) -> Result<()> {
    let seeds = [
        (CredentialKey::AccessToken, &auth.access_token),
        (CredentialKey::RefreshToken, &auth.refresh_token),
    ];
    for (key, value) in seeds {
        if let Some(token) = value {
            store
                .set(key, token.clone())
                .with_context(|| format!("failed to seed {}", key.as_str()))?;
            info!(key = key.as_str(), "seeded credential from environment");
        }
    }
    if store.get(CredentialKey::AccessToken).is_none() {
        warn!("no access token stored, sending request unauthenticated");
    }
    Ok(())
}

fn build_request(invocation: &Invocation) -> HttpRequest {
    let mut request = HttpRequest::new(invocation.method.clone(), invocation.path.clone());
    if let Some(ref body) = invocation.body {
        request = request
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body.clone());
    }
    request
}
