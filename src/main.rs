//! pdaval - pushdown-automaton validators for Sri Lankan NIC numbers and postal codes
//!
//! Serves the validators over a line-delimited JSON TCP protocol and an HTTP gateway.

use pdaval_core::Validator;
use pdaval_server::config::CONFIG_ENV;
use pdaval_server::{CommandHandler, Config, GatewayState, Metrics, Server, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if PDAVAL_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var(CONFIG_ENV) {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("Configuration error: {}", e);
        return Err(e.into());
    }

    tracing::info!("Starting pdaval server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);

    let districts = match config.districts.load_table() {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Failed to load district table: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("  Districts: {}", districts.len());

    let metrics = if config.metrics.enabled {
        tracing::info!("  Metrics: enabled");
        Some(Arc::new(Metrics::new()?))
    } else {
        tracing::info!("  Metrics: disabled");
        None
    };

    let mut handler = CommandHandler::new(Validator::new(districts));
    let mut server_config = ServerConfig::new(config.network.bind_addr)
        .with_idle_timeout(config.network.idle_timeout())
        .with_max_connections(config.network.max_connections);
    if let Some(metrics) = metrics {
        handler = handler.with_metrics(metrics.clone());
        server_config = server_config.with_metrics(metrics);
    }
    let server = Arc::new(Server::new(server_config, handler));

    // Spawn HTTP gateway
    let gateway_handle = if config.http.enabled {
        tracing::info!("  HTTP gateway: http://{}", config.http.bind_addr);
        let state = Arc::new(GatewayState::new(server.handler().clone(), &config.http)?);
        let http_config = config.http.clone();
        let shutdown = server.subscribe_shutdown();
        Some(tokio::spawn(async move {
            if let Err(e) = pdaval_server::run_gateway(&http_config, state, shutdown).await {
                tracing::error!("HTTP gateway error: {}", e);
            }
        }))
    } else {
        tracing::info!("  HTTP gateway: disabled");
        None
    };

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    if let Some(handle) = gateway_handle {
        let _ = handle.await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
