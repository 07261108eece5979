use serde::{Deserialize, Serialize};

use crate::domain::TaskId;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Bare `{"success":true}` acknowledgement.
    pub const fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFilesQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaQuery {
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(default)]
    pub old_path: String,
    #[serde(default)]
    pub new_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsRequest {
    #[serde(default)]
    pub media_root: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub task_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadResponse {
    pub task_id: TaskId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub media_root: String,
    pub active_downloads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_has_no_data_or_error() {
        let json = serde_json::to_string(&ApiResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }

    #[test]
    fn test_error_envelope() {
        let json = serde_json::to_string(&ApiResponse::<()>::error("nope")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"nope"}"#);
    }

    #[test]
    fn test_start_download_response_uses_camel_case() {
        let body = StartDownloadResponse {
            task_id: TaskId::from("1700000000000"),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"taskId":"1700000000000"}"#
        );
    }

    #[test]
    fn test_rename_request_tolerates_missing_fields() {
        let req: RenameRequest = serde_json::from_str(r#"{"oldPath":"a/b.png"}"#).unwrap();
        assert_eq!(req.old_path, "a/b.png");
        assert!(req.new_name.is_empty());
    }
}
