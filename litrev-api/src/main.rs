//! litrev-api - Literature review assistant service
//!
//! HTTP backend that searches bibliographic sources, scores papers for
//! relevance, synthesizes cross-paper insights, and composes literature
//! reviews, with progress observable by polling or SSE.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use litrev_common::{EventBus, Settings};
use litrev_api::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting litrev-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!("Database: {}", settings.database_path.display());

    let db_pool = litrev_api::db::init_pool(&settings.database_path).await?;
    info!("Database connection established");

    // Runs interrupted by a previous shutdown cannot resume; mark them
    let recovered = litrev_api::db::reviews::fail_interrupted(&db_pool).await?;
    if recovered > 0 {
        info!(count = recovered, "Marked interrupted analysis runs as errored");
    }

    let event_bus = EventBus::new(100);

    let state = AppState::new(db_pool, event_bus, &settings)?;
    let app = litrev_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    info!("Listening on http://{}", settings.bind_address);
    info!("Health check: http://{}/health", settings.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
