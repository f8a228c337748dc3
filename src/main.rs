//! AcadPay Server
//!
//! Payment verification and reconciliation service for school-administration
//! portals.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use acadpay::config::AppConfig;
use acadpay::handlers::{app_router, AppState};
use acadpay::payment::fees::{
    KEY_FEE_ALEVEL, KEY_FEE_JAMB, KEY_FEE_OLEVEL, KEY_FEE_SUBSCRIPTION,
};
use acadpay::payment::store::{InMemoryStore, SettingRow};
use acadpay::payment::{HttpGatewayVerifier, Reconciler, TracingAuditLog};

/// AcadPay Server
#[derive(Parser, Debug)]
#[command(name = "acadpay")]
#[command(author = "AcadPay Team <team@acadpay.dev>")]
#[command(version)]
#[command(about = "Payment verification and reconciliation service")]
struct Args {
    /// Port to listen on (overrides ACADPAY_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides ACADPAY_HOST)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    // The in-memory store backs dev deployments; production wires the
    // portal's persistent store behind the same traits.
    warn!("using in-memory store backend; data does not survive restarts");
    let store = Arc::new(InMemoryStore::new());
    store.put_settings(default_fee_settings());

    let gateway = Arc::new(HttpGatewayVerifier::new(&config.gateway)?);
    let reconciler = Reconciler::new(
        gateway,
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(TracingAuditLog),
        config.reconciler_config(),
    );
    let state = Arc::new(AppState::new(reconciler, store.clone(), store));

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        "AcadPay server listening on {}:{} (currency {}, tolerance {} bps)",
        config.host, config.port, config.operating_currency, config.tolerance_bps
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("AcadPay server shut down");
    Ok(())
}

fn default_fee_settings() -> Vec<SettingRow> {
    [
        (KEY_FEE_JAMB, "15000"),
        (KEY_FEE_ALEVEL, "20000"),
        (KEY_FEE_OLEVEL, "10000"),
        (KEY_FEE_SUBSCRIPTION, "1500"),
    ]
    .into_iter()
    .map(|(key, value)| SettingRow {
        key: key.to_string(),
        value: value.to_string(),
    })
    .collect()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
    }
}
