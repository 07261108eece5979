use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ListFilesQuery, RenameRequest};
use crate::domain::FileItem;
use crate::domain::events::NotificationEvent;
use crate::library;

/// `GET /api/files?path=<rel>`
///
/// Lists one directory of the media root. Any failure is a 500.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileItem>>, ApiError> {
    let root = state.settings().media_root().await;

    let items = library::list_directory(&root, &query.path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list '{}': {e}", query.path)))?;

    Ok(Json(items))
}

/// `POST /api/files/rename`
///
/// Every failure is a 500, an unreadable body included.
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::internal(format!("Rename failed: {}", e.body_text())))?;
    let root = state.settings().media_root().await;

    let new_path = library::rename_entry(&root, &request.old_path, &request.new_name)
        .await
        .map_err(|e| ApiError::internal(format!("Rename failed: {e}")))?;

    let _ = state.event_bus().send(NotificationEvent::FileRenamed {
        old_path: library::normalize_relative(&request.old_path),
        new_path,
    });

    Ok(Json(ApiResponse::ok()))
}
