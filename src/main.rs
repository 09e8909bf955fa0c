//! Scenario Gateway Server
//!
//! REST API server for portfolio scenario analysis.

use scenario_gateway::api::create_router;
use scenario_gateway::config::Config;
use scenario_gateway::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use scenario_gateway::models::{AnalyzeRequest, HealthResponse, Leg, Metrics, OptionType, Position};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        scenario_gateway::api::handlers::health_check,
        scenario_gateway::api::handlers::analyze_portfolio,
    ),
    components(
        schemas(
            HealthResponse,
            AnalyzeRequest,
            Position,
            Leg,
            OptionType,
            Metrics,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Analysis", description = "Portfolio scenario analysis"),
    ),
    info(
        title = "Scenario Gateway API",
        version = "0.1.0",
        description = "Portfolio scenario analysis over a remote pricing engine",
        license(name = "MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = match std::env::var("GATEWAY_CONFIG") {
        Ok(path) => {
            info!("Loading configuration from {}", path);
            Config::load(&path)?
        }
        Err(_) => Config::default(),
    };

    // Environment overrides for host and port
    if let Ok(host) = std::env::var("HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a valid number: {}", e))?;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::from_config(config)?);

    info!("Starting Scenario Gateway on {}", addr);
    info!("Swagger UI available at http://{}/swagger-ui/", addr);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
