use std::{net::SocketAddr, sync::Arc, time::Duration};

use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;
use twinpath_authn::{DEFAULT_COOKIE_NAME, IdentityConfig};
use twinpath_server::{AppState, build_router};
use twinpath_storage::{MemoryRecoveryStore, MemoryStoreConfig};

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str =
    "twinpath_server=info,twinpath_authn=info,twinpath_storage=info,warn";

#[derive(Parser)]
#[command(name = "twinpathd", version, about = "Dual-channel anonymous identity service")]
struct Cli {
    /// Socket address to bind, e.g. 127.0.0.1:3100
    #[arg(long, default_value = "127.0.0.1:3100", env = "TWINPATH_LISTEN")]
    listen: SocketAddr,
    /// Shared HMAC secret for signing identity tokens.
    #[arg(long, env = "TWINPATH_SECRET", hide_env_values = true)]
    secret: String,
    /// Name of the identity cookie.
    #[arg(long, default_value = DEFAULT_COOKIE_NAME, env = "TWINPATH_COOKIE_NAME")]
    cookie_name: String,
    /// Identity cookie lifetime, e.g. `30d` or `12h`.
    #[arg(
        long,
        default_value = "30d",
        value_parser = humantime::parse_duration,
        env = "TWINPATH_COOKIE_TTL"
    )]
    cookie_ttl: Duration,
    /// How long a validator key stays bound to its token.
    #[arg(
        long,
        default_value = "30d",
        value_parser = humantime::parse_duration,
        env = "TWINPATH_BINDING_TTL"
    )]
    binding_ttl: Duration,
    /// Upper bound on live validator bindings. Unbounded when omitted.
    #[arg(long, env = "TWINPATH_MAX_BINDINGS")]
    max_bindings: Option<usize>,
    /// Rewrite a reused validator key's binding with the re-signed token.
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        env = "TWINPATH_REFRESH_REUSED_BINDING"
    )]
    refresh_reused_binding: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c; shutting down");
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let identity = IdentityConfig::builder()
        .secret(cli.secret)
        .cookie_name(cli.cookie_name)
        .cookie_ttl(cli.cookie_ttl)
        .refresh_reused_binding(cli.refresh_reused_binding)
        .build()?;
    let store_config = MemoryStoreConfig::builder()
        .binding_ttl(cli.binding_ttl)
        .maybe_max_bindings(cli.max_bindings)
        .build()?;

    let store = Arc::new(MemoryRecoveryStore::with_config(store_config));
    let app = build_router(AppState::new(&identity, store.clone())?);

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!(
        address = %listener.local_addr()?,
        cookie_name = identity.cookie_name(),
        cookie_ttl = %humantime::format_duration(identity.cookie_ttl()),
        binding_ttl = %humantime::format_duration(cli.binding_ttl),
        "twinpathd listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    store.shutdown();
    Ok(())
}
