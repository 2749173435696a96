use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::AppState;
use configurator_lib::{
    build_render_scene, normalize, normalize_with_report, CameraController, PersistenceError,
    RenderScene, SceneStore, Viewport,
};
use shared::{SceneConfig, SceneKey};

/// Health check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn status_for(error: &PersistenceError) -> StatusCode {
    match error {
        PersistenceError::InvalidKey(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn scene_key((tenant, entity_type, entity_id): (String, String, String)) -> SceneKey {
    SceneKey::new(tenant, entity_type, entity_id)
}

/// Stored scene, normalized on the way out
pub async fn get_scene(
    State(state): State<AppState>,
    Path(path): Path<(String, String, String)>,
) -> Result<Json<SceneConfig>, StatusCode> {
    let key = scene_key(path);
    match state.store.load(&key).await {
        Ok(Some(value)) => Ok(Json(normalize(&value))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::warn!(%key, error = %e, "scene load failed");
            Err(status_for(&e))
        }
    }
}

/// Normalize the body and overwrite the stored scene
pub async fn put_scene(
    State(state): State<AppState>,
    Path(path): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<SceneConfig>, StatusCode> {
    let key = scene_key(path);
    let (config, report) = normalize_with_report(&body);
    if !report.is_clean() {
        tracing::debug!(%key, corrections = report.len(), "stored scene was corrected");
    }
    state.store.save(&key, &config).await.map_err(|e| {
        tracing::warn!(%key, error = %e, "scene save failed");
        status_for(&e)
    })?;
    Ok(Json(config))
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub config: SceneConfig,
    pub corrections: Vec<String>,
}

/// Normalize without storing; corrections are listed for diagnostics
pub async fn normalize_scene(Json(body): Json<Value>) -> Json<NormalizeResponse> {
    let (config, report) = normalize_with_report(&body);
    Json(NormalizeResponse {
        config,
        corrections: report.corrections.iter().map(|c| c.to_string()).collect(),
    })
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub config: Value,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl RenderRequest {
    fn viewport(&self) -> Viewport {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() => Viewport::new(w, h),
            _ => Viewport::default(),
        }
    }
}

/// Scene config → render contract
pub async fn render_scene(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderScene>, StatusCode> {
    let settings = state.settings.clone();
    let scene = tokio::task::spawn_blocking(move || {
        let config = normalize(&request.config);
        let camera = settings.configure_camera(CameraController::new(config.camera.clone(), request.viewport()));
        build_render_scene(&config, &camera)
    })
    .await
    .map_err(|e| {
        tracing::error!("Render error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(scene))
}
