//! Request gate service.
//!
//! ```text
//!     Client ──▶ CORS ──▶ request log ──▶ admission gate ──▶ rate limiter ──▶ handlers
//!                                                               │
//!                                                               ▼
//!                                                        counter store (Redis)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use request_gate::config::load_config;
use request_gate::lifecycle::{signals, ServerLifecycle};
use request_gate::observability::{logging, metrics};
use request_gate::persistence::Database;
use request_gate::routing;
use request_gate::store::{CounterStore, RedisCounterStore};
use request_gate::HttpServer;

#[derive(Parser)]
#[command(name = "request-gate")]
#[command(about = "HTTP request gate with admission control and distributed rate limiting", long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Load and validate configuration, then exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = load_config(cli.config.as_deref())?;
    if cli.check_config {
        println!("configuration OK");
        return Ok(());
    }

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("failed to initialize logging: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "request-gate starting");
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        rate_limit_scope = config.rate_limit.scope.as_str(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(RedisCounterStore::connect(&config.counter_store.address).await?);
    store.ping().await?;

    let database = Arc::new(Database::connect_lazy(&config.persistence)?);

    let server = HttpServer::new(
        &config,
        store.clone(),
        routing::routes(&config.admission.api_prefix),
    );

    let mut lifecycle = ServerLifecycle::new(config.shutdown.drain_timeout());
    {
        let store = store.clone();
        lifecycle.on_shutdown("counter-store", move || async move { store.close().await });
    }
    {
        let database = database.clone();
        lifecycle.on_shutdown("database", move || async move { database.close().await });
    }

    let listener = lifecycle.bind(&config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let report = lifecycle.run(listener, server, signals::interrupt()).await?;
    if report.cleanup_failures.is_empty() {
        tracing::info!(drained = report.drained, "Exiting");
    } else {
        for failure in &report.cleanup_failures {
            tracing::warn!(cleanup = %failure.name, error = %failure.error, "Resource not released cleanly");
        }
    }

    Ok(())
}
