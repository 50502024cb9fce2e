use serde_json::json;
use std::time::Duration;
use veogen::prelude::*;
use veogen::{DriverState, EmptyReason, GeminiClientBuilder, GeneratedArtifact};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIDEO_MODEL_PATH: &str = "/models/veo-3.0-fast-generate-001";
const OPERATION: &str = "models/veo-3.0-fast-generate-001/operations/op123";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClientBuilder::new()
        .api_key("test-api-key")
        .base_url(server.uri())
        .build()
        .unwrap()
}

fn fast_policy() -> PollPolicy {
    PollPolicy::every(Duration::from_millis(1))
}

async fn mount_submit(server: &MockServer, prompt: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{VIDEO_MODEL_PATH}:predictLongRunning")))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_json(json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "aspectRatio": "9:16",
                "resolution": "720p",
                "durationSeconds": 8,
                "personGeneration": "allow_all",
                "numberOfVideos": 1
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": OPERATION })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn generate_text_returns_model_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_json(json!({
            "contents": [{ "parts": [{ "text": "write a prompt" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "  Waves at dawn\n" }], "role": "model" },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = PromptSource::Dynamic {
        instruction: "write a prompt".into(),
    };
    let prompt = source.resolve(&client(&server)).await.unwrap();
    assert_eq!(prompt.as_deref(), Some("Waves at dawn"));
}

#[tokio::test]
async fn submit_poll_and_download_end_to_end() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let prompt = "A couple walking on a beach at sunset";
    let download_uri = format!("{}/files/vid0:download?alt=media", server.uri());

    mount_submit(&server, prompt).await;

    Mock::given(method("GET"))
        .and(path(format!("/{OPERATION}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": OPERATION, "done": false })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{OPERATION}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OPERATION,
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{ "video": { "uri": &download_uri } }]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/vid0:download"))
        .and(query_param("key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-mp4-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut driver = VideoJobDriver::new(client(&server))
        .with_poll_policy(fast_policy())
        .with_output_dir(dir.path());

    let videos = match driver.generate(prompt).await.unwrap() {
        JobOutcome::Saved { videos } => videos,
        other => panic!("expected saved videos, got {other:?}"),
    };
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].uri.as_deref(), Some(download_uri.as_str()));

    let saved = dir.path().join("video_0.mp4");
    assert_eq!(videos[0].path, saved);
    assert_eq!(std::fs::read(saved).unwrap(), b"fake-mp4-bytes");
    assert_eq!(driver.state(), DriverState::Done);
}

#[tokio::test]
async fn quota_refusal_is_reported_not_raised() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path(format!("{VIDEO_MODEL_PATH}:predictLongRunning")))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota, please check your plan and billing details.",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut driver = VideoJobDriver::new(client(&server))
        .with_poll_policy(fast_policy())
        .with_output_dir(dir.path());

    match driver.generate("A sunset").await.unwrap() {
        JobOutcome::QuotaExceeded { message } => {
            assert!(message.contains("RESOURCE_EXHAUSTED"), "{message}")
        }
        other => panic!("expected quota outcome, got {other:?}"),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn other_submission_errors_propagate() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path(format!("{VIDEO_MODEL_PATH}:predictLongRunning")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "Internal error", "status": "INTERNAL" }
        })))
        .mount(&server)
        .await;

    let mut driver = VideoJobDriver::new(client(&server))
        .with_poll_policy(fast_policy())
        .with_output_dir(dir.path());

    let err = driver.generate("A sunset").await.unwrap_err();
    match err {
        VeoGenError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "INTERNAL: Internal error");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(driver.state(), DriverState::Aborted);
}

#[tokio::test]
async fn completed_operation_without_videos_writes_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path(format!("{VIDEO_MODEL_PATH}:predictLongRunning")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OPERATION,
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [] } }
        })))
        .mount(&server)
        .await;

    let mut driver = VideoJobDriver::new(client(&server))
        .with_poll_policy(fast_policy())
        .with_output_dir(dir.path());

    let outcome = driver.generate("A sunset").await.unwrap();
    assert_eq!(
        outcome,
        JobOutcome::NoOutput {
            reason: EmptyReason::NoArtifacts
        }
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failed_download_aborts_the_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let prompt = "A sunset";

    mount_submit(&server, prompt).await;

    Mock::given(method("GET"))
        .and(path(format!("/{OPERATION}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OPERATION,
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        { "video": { "uri": format!("{}/files/gone:download", server.uri()) } },
                        { "video": { "uri": format!("{}/files/next:download", server.uri()) } }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/gone:download"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "code": 503, "message": "Backend unavailable", "status": "UNAVAILABLE" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/next:download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"never".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let mut driver = VideoJobDriver::new(client(&server))
        .with_poll_policy(fast_policy())
        .with_output_dir(dir.path());

    let err = driver.generate(prompt).await.unwrap_err();
    match err {
        VeoGenError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "UNAVAILABLE: Backend unavailable");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn rate_limited_download_keeps_retry_hint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/busy:download"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_json(json!({
                    "error": { "code": 429, "message": "Too many downloads", "status": "RESOURCE_EXHAUSTED" }
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let artifact = GeneratedArtifact::remote(format!("{}/files/busy:download", server.uri()));
    let err = client(&server).download(&artifact).await.unwrap_err();
    match err {
        VeoGenError::RateLimited {
            retry_after,
            message,
        } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
            assert_eq!(message, "RESOURCE_EXHAUSTED: Too many downloads");
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}
