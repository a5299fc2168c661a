//! galley-server entry point

use galley_server::core::{Config, ServerState};
use galley_server::payments::NullGateway;
use galley_server::services::tax::TaxTable;
use galley_server::utils::logger;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    logger::init_logger_with_file(Some("info"), Some(&config.work_dir));

    // Tax rates and the gateway adapter come from site provisioning;
    // the defaults run a cash-only site with no tax table loaded.
    let tax = Arc::new(load_tax_table(&config));
    let state = ServerState::new(config.clone(), tax, Arc::new(NullGateway))?;
    state.spawn_kitchen_router(None);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!(%addr, environment = %config.environment, "galley-server listening");

    let app = galley_server::api::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("galley-server stopped");
    Ok(())
}

/// Load the tax table from `<work_dir>/tax.json` when present
fn load_tax_table(config: &Config) -> TaxTable {
    let path = std::path::Path::new(&config.work_dir).join("tax.json");
    match std::fs::read(&path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Invalid tax table, using empty");
                TaxTable::default()
            }
        },
        Err(_) => {
            tracing::warn!(path = %path.display(), "No tax table found, using empty");
            TaxTable::default()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
