//! Shared test harness for the API integration tests.
//!
//! Builds the full application router over a temporary artifact tree and a
//! pipeline whose stages are instant stubs, so requests exercise the real
//! middleware stack and handlers without spawning external processes.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use vaani_api::config::ServerConfig;
use vaani_api::router::build_app_router;
use vaani_api::state::AppState;
use vaani_core::layout::ArtifactLayout;
use vaani_core::stage::{Stage, SEQUENCE};
use vaani_core::status::JobStatus;
use vaani_core::types::JobId;
use vaani_engines::{EngineError, StageContext, StageEngine, StageOutput};
use vaani_pipeline::{CancelRegistry, CancellationController, PipelineExecutor, Scheduler};
use vaani_store::{JobStore, NewJob};

/// Build a test `ServerConfig` with safe defaults over a temp uploads root.
pub fn test_config(uploads_dir: PathBuf, worker_count: usize, queue_depth: usize) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        uploads_dir,
        worker_count,
        queue_depth,
        strict_languages: true,
        retention_hours: 24,
        stage_timeout_multiplier: 1.0,
    }
}

/// A stage that completes immediately without touching the filesystem.
struct InstantStage(Stage);

#[async_trait]
impl StageEngine for InstantStage {
    fn stage(&self) -> Stage {
        self.0
    }

    async fn run(&self, _ctx: &StageContext) -> Result<StageOutput, EngineError> {
        Ok(StageOutput::default())
    }
}

/// First stage waits for a permit; the rest run instantly. Lets tests hold
/// a job inside a worker while they drive the HTTP surface.
struct GatedStage {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl StageEngine for GatedStage {
    fn stage(&self) -> Stage {
        Stage::IngestValidate
    }

    async fn run(&self, _ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let permit = self.gate.acquire().await.unwrap();
        permit.forget();
        Ok(StageOutput::default())
    }
}

fn stub_engines(gate: Option<Arc<Semaphore>>) -> Vec<Arc<dyn StageEngine>> {
    SEQUENCE
        .iter()
        .map(|&stage| match (&gate, stage) {
            (Some(gate), Stage::IngestValidate) => {
                Arc::new(GatedStage { gate: gate.clone() }) as Arc<dyn StageEngine>
            }
            _ => Arc::new(InstantStage(stage)) as Arc<dyn StageEngine>,
        })
        .collect()
}

/// Everything a test needs: the router plus handles into the pipeline.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<JobStore>,
    pub scheduler: Arc<Scheduler>,
    pub layout: ArtifactLayout,
    _dir: tempfile::TempDir,
}

/// Build the full application with stubbed stage engines.
///
/// This mirrors the wiring in `main.rs` so integration tests exercise the
/// same middleware stack (CORS, request ID, timeout, tracing, panic
/// recovery) that production uses.
pub fn spawn_app(worker_count: usize, queue_depth: usize, gate: Option<Arc<Semaphore>>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let layout = ArtifactLayout::new(dir.path());
    for d in layout.all_dirs() {
        std::fs::create_dir_all(d).unwrap();
    }

    let config = test_config(dir.path().to_path_buf(), worker_count, queue_depth);
    let store = Arc::new(JobStore::new());
    let registry = Arc::new(CancelRegistry::new());
    let executor = Arc::new(PipelineExecutor::new(
        store.clone(),
        stub_engines(gate),
        registry.clone(),
        layout.clone(),
        config.stage_timeout_multiplier,
    ));
    let scheduler = Scheduler::start(worker_count, queue_depth, executor);
    let controller = Arc::new(CancellationController::new(store.clone(), registry));

    let state = AppState {
        store: store.clone(),
        scheduler: scheduler.clone(),
        controller,
        layout: layout.clone(),
        config: Arc::new(config.clone()),
    };

    TestApp {
        app: build_app_router(state, &config),
        store,
        scheduler,
        layout,
        _dir: dir,
    }
}

impl TestApp {
    /// Insert a job record directly, bypassing the upload boundary.
    pub async fn create_job(&self) -> JobId {
        self.store
            .create(NewJob {
                source_path: self.layout.originals_dir().join("1700000000000.mp4"),
                from_lang: "en".to_string(),
                to_lang: "hi".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    /// Poll the store until the job reaches `status` (5s cap).
    pub async fn wait_for_status(&self, id: JobId, status: JobStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.store.get(id).await.unwrap().status == status {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("job never reached {status}"));
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty(), None).await
}

pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, Body::empty(), None).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty(), None).await
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Body,
    content_type: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(CONTENT_TYPE, ct);
    }
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the standard `{ "error": ..., "code": ... }` error body.
pub async fn assert_error_code(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
    assert!(json["error"].is_string());
}

// ---------------------------------------------------------------------------
// Multipart helpers
// ---------------------------------------------------------------------------

pub const BOUNDARY: &str = "vaani-test-boundary";

/// One part of a multipart form: `(name, file, bytes)` where `file` is
/// `Some((filename, content_type))` for file parts and `None` for text.
pub type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a [u8]);

/// Encode a multipart/form-data body with [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file {
            Some((filename, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
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
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart form to `/api/upload`.
pub async fn post_upload(app: &Router, parts: &[Part<'_>]) -> Response<Body> {
    send(
        app,
        Method::POST,
        "/api/upload",
        Body::from(multipart_body(parts)),
        Some(&format!("multipart/form-data; boundary={BOUNDARY}")),
    )
    .await
}
