use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use configurator_lib::persistence::FileSceneStore;
use configurator_lib::EngineSettings;
use tower_http::cors::CorsLayer;

mod routes;

const DEFAULT_PORT: u16 = 3001;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FileSceneStore>,
    pub settings: Arc<EngineSettings>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route(
            "/api/scene-state/{tenant}/{entity_type}/{entity_id}",
            get(routes::get_scene).put(routes::put_scene),
        )
        .route("/api/scene/normalize", post(routes::normalize_scene))
        .route("/api/scene/render", post(routes::render_scene))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,configurator_lib=info".into()),
        )
        .init();

    let settings = EngineSettings::load();
    let store = match std::env::var("SCENE_DATA_DIR") {
        Ok(dir) if !dir.trim().is_empty() => FileSceneStore::new(dir),
        _ => settings.file_store(),
    };
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT);

    tracing::info!(root = %store.root().display(), "scene store ready");
    let state = AppState {
        store: Arc::new(store),
        settings: Arc::new(settings),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "could not bind");
            std::process::exit(1);
        }
    };
    tracing::info!("Server running on http://localhost:{}", port);
    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
