//! End-to-end scenarios

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::config::DeliveryMode;
use crate::error::{FetchFailure, ProcessorError, RenderFailure};
use crate::http::create_router;
use crate::integration::fixtures::{
    config_in, files_in, state_with, Behavior, FakeRunner, FETCH_BIN, RENDER_BIN,
};
use crate::pipeline::{JobOutcome, SegmentRequest, SegmentRequestBody};
use crate::state::AppState;
use crate::store::{ArtifactStore, ManualClock};

const SOURCE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn request(caption: &str, cta: &str) -> SegmentRequest {
    SegmentRequest::try_from(SegmentRequestBody {
        video_url: Some(SOURCE.to_string()),
        start_time: Some(30.0),
        duration: Some(60.0),
        caption: Some(caption.to_string()),
        cta: Some(cta.to_string()),
    })
    .unwrap()
}

fn post_segment(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/process-segment")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

const SCENARIO_A: &str = r#"{
    "videoUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    "startTime": 30,
    "duration": 60,
    "caption": "Hello",
    "cta": "Follow"
}"#;

#[tokio::test]
async fn test_scenario_a_inline() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::working();
    let app = create_router(state_with(
        config_in(dir.path(), DeliveryMode::Inline),
        runner.clone(),
    ));

    let (status, body) = call(&app, post_segment(SCENARIO_A)).await;
    assert_eq!(status, StatusCode::OK);

    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["segment"]["start"], 30.0);
    assert_eq!(body["segment"]["duration"], 60.0);
    assert!(body["fileName"].as_str().unwrap().ends_with("_processed.mp4"));

    let video = base64::engine::general_purpose::STANDARD
        .decode(body["video"].as_str().unwrap())
        .unwrap();
    let render = runner.last(RENDER_BIN).unwrap();
    assert_eq!(video, FakeRunner::rendered_bytes(&render));
    assert_eq!(body["size"], video.len() as u64);

    let fetch = runner.last(FETCH_BIN).unwrap();
    assert_eq!(fetch.value_of("--download-sections").unwrap(), "*30-90");

    assert!(files_in(dir.path()).is_empty(), "inline run leaked temp files");
}

#[tokio::test]
async fn test_scenario_a_deferred_then_download() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::working();
    let state = state_with(config_in(dir.path(), DeliveryMode::Deferred), runner.clone());
    let app = create_router(state.clone());

    let (status, body) = call(&app, post_segment(SCENARIO_A)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["segment"]["start"], 30.0);
    assert_eq!(body["expiresInSecs"], 600);

    let url = body["downloadUrl"].as_str().unwrap();
    let id = url.strip_prefix("http://shorts.test/download/").unwrap();

    // Exactly one stored artifact remains, the raw fetch is gone
    let files = files_in(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].to_string_lossy().ends_with("_processed.mp4"));
    assert_eq!(state.store.len(), 1);

    let (status, bytes) = call(
        &app,
        Request::get(format!("/download/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        bytes,
        FakeRunner::rendered_bytes(&runner.last(RENDER_BIN).unwrap())
    );

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/download/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let length = response.headers()[header::CONTENT_LENGTH].to_str().unwrap().to_string();
    assert_eq!(length, bytes.len().to_string());
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "video/mp4"
    );

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/download/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(files_in(dir.path()).is_empty());

    let (status, _) = call(
        &app,
        Request::get(format!("/download/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scenario_b_missing_start_time() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::working();
    let app = create_router(state_with(
        config_in(dir.path(), DeliveryMode::Inline),
        runner.clone(),
    ));

    let (status, body) = call(
        &app,
        post_segment(r#"{"videoUrl":"https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "videoUrl and startTime required");
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_scenario_c_fetch_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(Behavior::Timeout, Behavior::Succeed);
    let state = state_with(config_in(dir.path(), DeliveryMode::Inline), runner.clone());

    let err = state
        .pipeline
        .run(&request("Hello", "Follow"), DeliveryMode::Inline)
        .await
        .unwrap_err();

    match err {
        ProcessorError::Fetch(e) => assert_eq!(e.reason, FetchFailure::Timeout),
        other => panic!("expected fetch timeout, got {:?}", other),
    }
    assert_eq!(runner.count(FETCH_BIN), 1);
    assert_eq!(runner.count(RENDER_BIN), 0);
    assert!(files_in(dir.path()).is_empty());

    let app = create_router(state);
    let (status, body) = call(&app, post_segment(SCENARIO_A)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_eq!(body["stage"], "fetch");
    assert_eq!(body["reason"], "timeout");
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_scenario_d_unsafe_caption() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::working();
    let state = state_with(config_in(dir.path(), DeliveryMode::Inline), runner.clone());

    let outcome = state
        .pipeline
        .run(&request("Don't 💥 stop", "Follow"), DeliveryMode::Inline)
        .await
        .unwrap();
    assert!(matches!(outcome, JobOutcome::Inline { .. }));

    let render = runner.last(RENDER_BIN).unwrap();
    let graph = render.value_of("-vf").unwrap().to_string_lossy().into_owned();
    assert!(!graph.contains('💥'));
    // Quote closed, escaped, reopened; then graph-escaped
    assert!(graph.contains(r"text=\'Don\'\\\'\'t stop\'"), "{}", graph);
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_render_failure_cleans_up_and_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(
        Behavior::Succeed,
        Behavior::Fail("Error initializing filter 'drawtext'"),
    );
    let state = state_with(config_in(dir.path(), DeliveryMode::Deferred), runner.clone());
    let app = create_router(state.clone());

    let (status, body) = call(&app, post_segment(SCENARIO_A)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_eq!(body["stage"], "render");
    assert_eq!(body["reason"], "tool_failure");
    assert_eq!(body["stderr"], "Error initializing filter 'drawtext'");

    assert_eq!(runner.count(FETCH_BIN), 1);
    assert_eq!(runner.count(RENDER_BIN), 1);
    assert!(files_in(dir.path()).is_empty());
    assert!(state.store.is_empty());
}

#[tokio::test]
async fn test_fetch_failure_does_not_retry() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(Behavior::Fail("ERROR: Video unavailable"), Behavior::Succeed);
    let state = state_with(config_in(dir.path(), DeliveryMode::Inline), runner.clone());

    let err = state
        .pipeline
        .run(&request("Hello", "Follow"), DeliveryMode::Inline)
        .await
        .unwrap_err();

    match err {
        ProcessorError::Fetch(e) => {
            assert_eq!(e.reason, FetchFailure::ToolFailure);
            assert_eq!(e.detail, "ERROR: Video unavailable");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(runner.calls().len(), 1);
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_render_timeout_surfaces_render_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(Behavior::Succeed, Behavior::Timeout);
    let state = state_with(config_in(dir.path(), DeliveryMode::Inline), runner);

    let err = state
        .pipeline
        .run(&request("Hello", "Follow"), DeliveryMode::Inline)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProcessorError::Render(ref e) if e.reason == RenderFailure::Timeout
    ));
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_concurrent_jobs_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::working();
    let state = state_with(config_in(dir.path(), DeliveryMode::Deferred), runner.clone());

    let jobs: Vec<_> = (0..8)
        .map(|i| {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .pipeline
                    .run(&request(&format!("Clip {}", i), "Follow"), DeliveryMode::Deferred)
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for job in jobs {
        match job.await.unwrap().unwrap() {
            JobOutcome::Stored { artifact, .. } => ids.push(artifact.id),
            other => panic!("unexpected {:?}", other),
        }
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 8);
    assert_eq!(state.store.len(), 8);
    assert_eq!(files_in(dir.path()).len(), 8);

    assert_eq!(state.store.purge(), 8);
    assert!(files_in(dir.path()).is_empty());
    assert_eq!(runner.count(RENDER_BIN), 8);
}

#[tokio::test]
async fn test_download_expires_after_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::working();
    let config = config_in(dir.path(), DeliveryMode::Deferred);
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(ArtifactStore::with_clock(&config.store, clock.clone()));
    let ttl = store.ttl();
    let state = Arc::new(AppState::with_parts(config, runner, store));
    let app = create_router(state.clone());

    let (status, body) = call(&app, post_segment(SCENARIO_A)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let id = body["downloadUrl"]
        .as_str()
        .unwrap()
        .strip_prefix("http://shorts.test/download/")
        .unwrap()
        .to_string();
    let download = || {
        Request::get(format!("/download/{}", id))
            .body(Body::empty())
            .unwrap()
    };

    clock.advance(ttl);
    let (status, _) = call(&app, download()).await;
    assert_eq!(status, StatusCode::OK, "still live exactly at the TTL");

    clock.advance(Duration::from_secs(1));
    let (status, body) = call(&app, download()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "File expired or not found");

    // The sweep then deletes the file itself
    assert_eq!(state.store.evict_expired(), 1);
    assert!(files_in(dir.path()).is_empty());
}

/// Fetch tool that leaves a `.part` fragment and a helper that writes the
/// declared output after a delay, then hangs
#[cfg(unix)]
const HANGING_FETCH_SCRIPT: &str = r#"#!/bin/sh
OUT=""
while [ $# -gt 0 ]; do
    if [ "$1" = "-o" ]; then OUT="$2"; fi
    shift
done
echo partial > "$OUT.part"
(sleep 2; echo late > "$OUT") &
sleep 30
"#;

#[cfg(unix)]
#[tokio::test]
async fn test_fetch_timeout_with_real_process_leaves_nothing() {
    use crate::tool::ProcessRunner;
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = tempfile::tempdir().unwrap();
    let tool = bin_dir.path().join("fake-yt-dlp");
    std::fs::write(&tool, HANGING_FETCH_SCRIPT).unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path(), DeliveryMode::Inline);
    config.fetch.binary = tool.to_string_lossy().into_owned();
    config.fetch.timeout_secs = 1;
    let store = Arc::new(ArtifactStore::new(&config.store));
    let state = AppState::with_parts(config, Arc::new(ProcessRunner), store);

    let err = state
        .pipeline
        .run(&request("Hello", "Follow"), DeliveryMode::Inline)
        .await
        .unwrap_err();
    match err {
        ProcessorError::Fetch(e) => assert_eq!(e.reason, FetchFailure::Timeout),
        other => panic!("expected fetch timeout, got {:?}", other),
    }
    assert!(files_in(dir.path()).is_empty(), "{:?}", files_in(dir.path()));

    // Past the point where the helper would have written the output
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(files_in(dir.path()).is_empty(), "{:?}", files_in(dir.path()));
}
