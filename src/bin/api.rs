use financial_query_orchestrator::{
    agent::Orchestrator,
    api::{start_server, ApiState},
    brief::{spawn_brief_refresher, BriefCache},
    config::Settings,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    if settings.gemini_api_key.is_none() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Generation endpoints will report the missing key");
    }

    info!("🚀 Financial Query Orchestrator - API Server");
    info!("📍 Port: {}", settings.port);

    let orchestrator = Arc::new(Orchestrator::from_settings(&settings)?);

    // Seed the semantic index up front so the first question does not pay for it.
    if let Err(e) = orchestrator.retrieval().ensure_seeded().await {
        warn!(error = %e, "Index seeding failed; retrying on first retrieval");
    }

    let briefs = Arc::new(BriefCache::new());
    let refresher = spawn_brief_refresher(
        orchestrator.clone(),
        briefs.clone(),
        settings.brief_refresh_interval,
    );

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    let served = start_server(ApiState { orchestrator, briefs }, settings.port).await;
    refresher.abort();
    served?;

    Ok(())
}
