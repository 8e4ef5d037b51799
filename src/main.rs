//! Tutor agent HTTP server

use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor_agent::agent::{Orchestrator, OrchestratorConfig};
use tutor_agent::api::{create_router, AppState};
use tutor_agent::config::ServiceConfig;
use tutor_agent::gate::{AdmissionGate, ConcurrencyGate};
use tutor_agent::llm;
use tutor_agent::skills::{MemorySkill, SkillRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_agent=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServiceConfig::from_env();
    config.validate()?;

    // Model provider
    let llm_service = llm::build_service(&config.llm)?;
    tracing::info!(model = %config.llm.model(), "LLM service initialized");

    // Skills
    tracing::info!(path = %config.memory_store_path.display(), "Using memory store");
    let memory = MemorySkill::open(&config.memory_store_path);
    let skills = SkillRegistry::standard(config.web_search_endpoint.clone(), memory)?;
    tracing::info!(skills = ?skills.names().collect::<Vec<_>>(), "Skill registry initialized");

    // Orchestrator and gates
    let provider_gate = ConcurrencyGate::new("provider", config.provider_max_concurrency);
    let orchestrator = Orchestrator::new(
        llm_service,
        Arc::new(skills),
        provider_gate,
        OrchestratorConfig {
            max_rounds: config.max_rounds,
            max_tokens: config.llm.max_tokens,
            system_prompt: None,
        },
    );
    let admission = AdmissionGate::new(config.heavy_max_in_flight, config.retry_after);
    tracing::info!(
        provider_max_concurrency = config.provider_max_concurrency,
        heavy_max_in_flight = config.heavy_max_in_flight,
        max_rounds = config.max_rounds,
        "Gates configured"
    );

    let state = AppState::new(Arc::new(orchestrator), admission, config.request_timeout);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Tutor agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
