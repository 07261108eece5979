use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::constants::downloads::MAX_UPLOAD_BYTES;
use crate::domain::events::NotificationEvent;
use crate::services::{DownloadManager, SettingsStore};
use crate::state::SharedState;

mod assets;
mod bt;
mod error;
pub mod events;
mod files;
mod media;
mod observability;
mod settings;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsStore {
        &self.shared.settings
    }

    #[must_use]
    pub fn downloads(&self) -> &Arc<DownloadManager> {
        &self.shared.downloads
    }

    #[must_use]
    pub fn event_bus(&self) -> &broadcast::Sender<NotificationEvent> {
        &self.shared.event_bus
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().read().await.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/files", get(files::list_files))
        .route("/files/rename", post(files::rename_file))
        .route("/media", get(media::serve_media))
        .route(
            "/settings",
            get(settings::get_settings).post(settings::save_settings),
        )
        .route(
            "/bt",
            get(bt::get_download_status)
                .post(bt::start_download)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/system/status", get(system::get_status))
        .route("/system/health/live", get(system::health_live))
        .route("/metrics", get(observability::get_metrics))
        .merge(events::router())
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .fallback(assets::serve_asset)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}
