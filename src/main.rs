use market_gateway::api::{run_server, AppState};
use market_gateway::config::AppConfig;
use market_gateway::engine::factory::build_invoker;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info")),
        )
        .init();

    info!("Starting Market Gateway v{}...", env!("CARGO_PKG_VERSION"));

    // Load Configuration
    let config = AppConfig::load()?;
    info!("Loaded Configuration: {:?}", config);

    // Initialize the analysis engine invoker
    let invoker = build_invoker(&config);

    let app_state = Arc::new(AppState { invoker, config });

    // Start API Server
    info!("Initializing API Server...");
    run_server(app_state).await?;

    Ok(())
}
