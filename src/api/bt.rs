use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
};
use std::sync::Arc;

use super::validation::validate_task_id;
use super::{ApiError, AppState, StartDownloadResponse, TaskQuery};
use crate::domain::TaskId;
use crate::services::{TaskSnapshot, TorrentSource};

const URL_FIELD: &str = "torrentUrl";
const FILE_FIELD: &str = "torrentFile";

/// `POST /api/bt`
///
/// Multipart body with a `torrentUrl` text field or a `torrentFile` upload.
/// When both are present the file wins.
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StartDownloadResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let source = read_torrent_source(multipart).await?;

    let save_dir = state.settings().download_dir().await;
    let task_id = state.downloads().start(source, save_dir).await?;

    Ok(Json(StartDownloadResponse { task_id }))
}

/// `GET /api/bt?taskId=<id>`
///
/// 404 once the task has finished or failed; it is dropped from the registry
/// at that point.
pub async fn get_download_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<TaskSnapshot>, ApiError> {
    let task_id = TaskId::from(validate_task_id(query.task_id.as_deref())?);

    state
        .downloads()
        .status(&task_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task", &task_id))
}

async fn read_torrent_source(mut multipart: Multipart) -> Result<TorrentSource, ApiError> {
    let mut url = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(URL_FIELD) => {
                let text = field.text().await.map_err(invalid_form)?;
                let text = text.trim();
                if !text.is_empty() {
                    url = Some(text.to_string());
                }
            }
            Some(FILE_FIELD) => {
                let bytes = field.bytes().await.map_err(invalid_form)?;
                if !bytes.is_empty() {
                    file = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    file.map(TorrentSource::File)
        .or_else(|| url.map(TorrentSource::Url))
        .ok_or_else(|| ApiError::validation("Provide a torrent link or a .torrent file"))
}

fn invalid_form(err: MultipartError) -> ApiError {
    ApiError::validation(format!("Invalid form data: {}", err.body_text()))
}
