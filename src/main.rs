// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;

use poll_results::{create_routes, Config, PgWarehouse, PollCatalog, PollService};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!("poll results server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let catalog = PollCatalog::load(&config.polls_file)?;
    tracing::info!("loaded {} polls from {}", catalog.len(), config.polls_file.display());

    let warehouse = PgWarehouse::new(&config)?;
    tracing::info!("using warehouse schema {}", config.schema);

    let service = Arc::new(PollService::new(warehouse, catalog, config.tx_explorer_url.clone()));
    let app = create_routes(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);
    axum_server::bind(addr).serve(app.into_make_service()).await?;
    Ok(())
}
