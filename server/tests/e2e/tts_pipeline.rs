//! End-to-end tests for the complete TTS pipeline
//! Tests: Text input -> chunking -> synthesis -> stored artifact -> playback

use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_complete_tts_pipeline() {
    let app = create_test_app(FakeBackend::default());

    // Step 1: Get available voices
    let (status, _, body) = get(&app.router, "/voices").await;
    assert_eq!(status, StatusCode::OK);
    let voices: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let voice = voices["voices"][3].as_str().unwrap().to_string();

    // Step 2: Synthesize ~9000 characters
    let text = nine_thousand_chars();
    assert!(text.chars().count() > 8000 && text.chars().count() <= 9000);
    let (status, body) = post_json(
        &app.router,
        "/tts",
        json!({ "text": text, "voice": voice, "model": "tts-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Three chunks, three remote calls, in order, each within the limit
    assert_eq!(body["chunks"], 3);
    let calls = app.backend.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(req, _)| req.input.chars().count() <= 4000));
    assert!(calls.iter().all(|(req, _)| req.model == "tts-1"));
    let rejoined: Vec<String> = calls.iter().map(|(req, _)| req.input.clone()).collect();
    assert_eq!(rejoined.join(" "), text);

    // Step 3: exactly one non-empty artifact, holding the concatenation in chunk order
    let files = app.output_files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0], body["file_name"].as_str().unwrap());

    let expected: Vec<u8> = calls
        .iter()
        .flat_map(|(req, _)| format!("[{}]", req.input).into_bytes())
        .collect();
    let (status, _, audio) = get(&app.router, body["audio_url"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audio, expected);
    assert_eq!(body["bytes"], expected.len());
}

#[tokio::test]
async fn test_empty_input_never_reaches_backend() {
    let app = create_test_app(FakeBackend::default());

    let (status, _) = post_json(&app.router, "/tts", json!({ "text": "\n\n   \t" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = multipart_body(&[], "blank.txt", b"   \r\n ");
    let (status, _) = post_multipart(&app.router, "/tts/upload", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.backend.call_count(), 0);
    assert!(app.output_files().is_empty());
}

#[tokio::test]
async fn test_repeated_generations_write_separate_files() {
    let app = create_test_app(FakeBackend::default());

    for _ in 0..3 {
        let (status, _) = post_json(&app.router, "/tts", json!({ "text": "again" })).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.output_files().len(), 3);
}
