// HTTP API - axum router over the services, mounted under /api/v1

pub mod blog;
pub mod events;
pub mod extract;
pub mod feed;
pub mod users;
pub mod venues;

use axum::{extract::State, middleware, response::Json, routing::get, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::{AppState, BLOB_PUBLIC_PREFIX};
use crate::core::GeoPoint;
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::viewer_context_middleware;

/// Envelope for every successful response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

pub type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyParams {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<u32>,
    /// Comma-separated; venues only
    pub categories: Option<String>,
}

impl NearbyParams {
    pub fn center(&self) -> AppResult<GeoPoint> {
        GeoPoint::new(self.lat, self.lng)
    }

    pub fn category_list(&self) -> Vec<String> {
        self.categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Image upload body; `data` is base64
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageUpload {
    pub file_name: String,
    pub data: String,
}

impl ImageUpload {
    pub fn bytes(&self) -> AppResult<Vec<u8>> {
        let bytes = STANDARD
            .decode(self.data.trim())
            .map_err(|e| AppError::Validation(format!("Image data is not valid base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Image data is empty".to_string()));
        }
        Ok(bytes)
    }
}

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    state.store.health_check().await?;
    ok(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(events::routes())
        .merge(venues::routes())
        .merge(users::routes())
        .merge(feed::routes())
        .merge(blog::routes());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .nest_service(BLOB_PUBLIC_PREFIX, ServeDir::new(&state.config.storage.root))
        .layer(middleware::from_fn(viewer_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
