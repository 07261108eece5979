#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use mediabox::config::Config;
use mediabox::domain::TaskId;
use mediabox::services::{EngineError, TaskEvents, TorrentEngine, TorrentSource};
use mediabox::state::SharedState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// In-process engine: records what it was asked to do and hands the test
/// the event sink of every started task.
#[derive(Default)]
pub struct FakeEngine {
    pub refuse: bool,
    pub stop_delay: Option<Duration>,
    pub started: Mutex<Vec<(TaskId, TorrentSource, PathBuf)>>,
    pub sinks: Mutex<HashMap<TaskId, TaskEvents>>,
    pub stopped: Mutex<Vec<TaskId>>,
}

impl FakeEngine {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// An engine whose teardown takes `delay`, like a remote client would.
    pub fn slow_to_stop(delay: Duration) -> Self {
        Self {
            stop_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sink(&self, task_id: &str) -> TaskEvents {
        self.sinks
            .lock()
            .unwrap()
            .get(&TaskId::from(task_id))
            .cloned()
            .expect("task was never started")
    }

    pub fn stopped(&self) -> Vec<TaskId> {
        self.stopped.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TorrentEngine for FakeEngine {
    async fn start(
        &self,
        task_id: &TaskId,
        source: TorrentSource,
        save_dir: &Path,
        events: TaskEvents,
    ) -> Result<(), EngineError> {
        if self.refuse {
            return Err(EngineError::Unavailable("engine offline".to_string()));
        }
        self.started
            .lock()
            .unwrap()
            .push((task_id.clone(), source, save_dir.to_path_buf()));
        self.sinks.lock().unwrap().insert(task_id.clone(), events);
        Ok(())
    }

    async fn stop(&self, task_id: &TaskId) {
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        self.stopped.lock().unwrap().push(task_id.clone());
    }
}

pub struct TestApp {
    pub router: Router,
    pub engine: Arc<FakeEngine>,
    pub state: Arc<SharedState>,
    pub media: TempDir,
    pub config_dir: TempDir,
}

impl TestApp {
    pub fn media_root(&self) -> &Path {
        self.media.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("config.toml")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(FakeEngine::default()).await
}

pub async fn spawn_app_with(engine: FakeEngine) -> TestApp {
    let media = tempfile::tempdir().unwrap();
    let config_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.library.media_root = media.path().display().to_string();

    let engine = Arc::new(engine);
    let state = Arc::new(SharedState::with_engine(
        config,
        config_dir.path().join("config.toml"),
        engine.clone(),
    ));
    let app_state = mediabox::api::create_app_state(state.clone(), None);
    let router = mediabox::api::router(app_state).await;

    TestApp {
        router,
        engine,
        state,
        media,
        config_dir,
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub const BOUNDARY: &str = "mediabox-test-boundary";

/// Builds a `multipart/form-data` body. Each part is `(name, filename, bytes)`.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/x-bittorrent\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/bt")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}
