use clap::Parser;
use gateway::config::GatewayConfig;
use gateway::router::create_router;
use gateway::state::AppState;
use matching_engine::Engine;
use std::path::PathBuf;
use std::sync::Arc;
use store::Store;
use tokio::net::TcpListener;
use tokio::signal;

/// Command line arguments for the matching engine gateway
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 0.0.0.0:3000
    #[arg(long)]
    listen: Option<String>,

    /// Data directory override
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Listens for Ctrl+C and SIGTERM so in-flight placements finish before
/// the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_toml(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    tracing::info!(data_dir = %config.data_dir.display(), "Starting matching engine gateway");

    // Fatal startup errors (unreadable or corrupt store, recovery
    // failure, bind failure) propagate out of main and exit non-zero.
    let store = Arc::new(Store::open(&config.data_dir, config.wal_sync.into())?);
    let engine = Arc::new(Engine::new(store));
    let report = engine.recover()?;
    tracing::info!(
        orders = report.orders_restored,
        bids = report.bids,
        asks = report.asks,
        "Order book recovered"
    );
    if report.market_rows_skipped > 0 {
        tracing::warn!(
            rows = report.market_rows_skipped,
            "Skipped live market order rows during recovery"
        );
    }

    let state = AppState::new(engine, config.default_symbol.clone());
    let app = create_router(state);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
