use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::validation::require_field;
use super::{ApiError, ApiResponse, AppState, SaveSettingsRequest};
use crate::domain::events::NotificationEvent;
use crate::services::Settings;

/// `GET /api/settings`
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings().settings().await)
}

/// `POST /api/settings`
///
/// The new media root must be an existing directory. It applies to every
/// request after this one returns.
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveSettingsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let media_root = require_field("mediaRoot", &request.media_root)?.trim();

    state.settings().update_media_root(media_root).await?;

    let _ = state.event_bus().send(NotificationEvent::SettingsUpdated {
        media_root: media_root.to_string(),
    });

    Ok(Json(ApiResponse::ok()))
}
