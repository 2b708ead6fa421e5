use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use zin::backend::{AppwriteClient, DynBackend, MemoryBackend};
use zin::config::{BackendKind, Cli, Config};
use zin::gateway::Gateway;
use zin::routes;
use zin::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let backend: DynBackend = match config.backend.kind {
        BackendKind::Appwrite => {
            tracing::info!("Using backend at {}", config.backend.endpoint);
            Arc::new(AppwriteClient::new(&config.backend)?)
        }
        BackendKind::Memory => {
            tracing::warn!("Using in-memory backend; nothing is persisted");
            let endpoint = url::Url::parse(&config.backend.endpoint)?;
            Arc::new(MemoryBackend::new(endpoint, config.backend.project_id.clone()))
        }
    };

    let gateway = Gateway::new(backend, config.collections.clone(), config.feed);

    // Build app state
    let state = AppState {
        gateway: Arc::new(gateway),
        config: config.clone(),
    };

    let mut app = routes::router(state).layer(TraceLayer::new_for_http());

    if !config.server.allowed_origins.is_empty() {
        let origins = config
            .server
            .allowed_origins
            .iter()
            .map(|o| HeaderValue::from_str(o))
            .collect::<Result<Vec<_>, _>>()?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
