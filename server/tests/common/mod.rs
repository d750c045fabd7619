//! Common utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use server::{build_router, config::ServerConfig, AppState};
use tempfile::TempDir;
use tower::ServiceExt;
use tts_core::{
    ArtifactStore, BackendError, RequestShape, SpeechBackend, SpeechPayload, SpeechRequest,
    Synthesizer, TtsManager,
};

pub const BOUNDARY: &str = "----tts-test-boundary";

/// Speech backend that answers with `[<input>]` and records every call.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<(SpeechRequest, RequestShape)>>,
    pub silent: bool,
    pub rejected: Option<RequestShape>,
    pub failure: Option<BackendError>,
}

impl FakeBackend {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechBackend for FakeBackend {
    async fn speak(
        &self,
        request: &SpeechRequest,
        shape: RequestShape,
    ) -> Result<SpeechPayload, BackendError> {
        self.calls.lock().unwrap().push((request.clone(), shape));
        if self.rejected == Some(shape) {
            return Err(BackendError::ShapeRejected {
                field: shape.field_name(),
                message: "Unrecognized request argument".into(),
            });
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.silent {
            return Ok(SpeechPayload::Bytes(Vec::new()));
        }
        Ok(SpeechPayload::Bytes(format!("[{}]", request.input).into_bytes()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<FakeBackend>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        output_dir: dir.path().to_path_buf(),
        ..ServerConfig::default()
    }
}

/// Create a test app backed by `backend`
pub fn create_test_app(backend: FakeBackend) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let backend = Arc::new(backend);

    let tts = TtsManager::new(
        Synthesizer::new(backend.clone()),
        ArtifactStore::new(dir.path()),
        config.max_chars_per_chunk,
    );
    let router = build_router(AppState::ready(config, tts));

    TestApp {
        router,
        backend,
        dir,
    }
}

/// Create a test app with no API key configured
pub fn create_unconfigured_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let state = AppState::unconfigured(
        config,
        ArtifactStore::new(dir.path()),
        "Missing OPENAI_API_KEY",
    );

    TestApp {
        router: build_router(state),
        backend: Arc::new(FakeBackend::default()),
        dir,
    }
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Build a multipart body with text fields followed by one file field.
pub fn multipart_body(fields: &[(&str, &str)], file_name: &str, file: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Roughly 9000 characters of ordinary prose-like text.
pub fn nine_thousand_chars() -> String {
    let words: Vec<String> = (0..1500).map(|i| format!("w{:04}", i)).collect();
    words.join(" ")
}
