mod config;
mod error;
mod miner;
mod nodes_file;
mod peers;
mod routes;
mod state;

use clap::Parser;
use config::{Args, NodeConfig};
use state::AppState;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = NodeConfig::from_args(Args::parse())?;
    let state = AppState::init(&config).await?;
    info!(node_id = %state.node_id, "ledger-node starting");

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("ledger-node listening on http://{}", config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
