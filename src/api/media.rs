use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState, MediaQuery};
use crate::library;

/// `GET /api/media?filePath=<rel>`
///
/// Streams the whole file back with a content type from the extension
/// table. Directories and missing paths are 404.
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MediaQuery>,
) -> Result<Response, ApiError> {
    let root = state.settings().media_root().await;
    let media = library::read_media(&root, &query.file_path).await?;

    let headers = [
        (header::CONTENT_TYPE, media.content_type.to_string()),
        (header::CONTENT_LENGTH, media.len().to_string()),
    ];

    Ok((headers, media.bytes).into_response())
}
