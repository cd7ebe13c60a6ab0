//! Entry endpoints driven over HTTP against fake providers.

mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp};
use dreamreel_providers::fake::{fake_asset_url, fake_playback};
use dreamreel_providers::{JobStatus, PublishStatus};
use serde_json::json;

const MISSING_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8057";

// ---------------------------------------------------------------------------
// Create Entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_and_starts_nothing() {
    let app = TestApp::new();
    let id = app.create_entry().await;

    assert_eq!(app.status(&id).await, "awaiting_images");
    assert_eq!(app.images.submissions(), 0);
}

#[tokio::test]
async fn create_accepts_missing_video_prompt() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/entries",
            json!({ "firstImagePrompt": "a cat", "lastImagePrompt": "a dog" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn create_rejects_blank_image_prompt() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/entries",
            json!({ "firstImagePrompt": "   ", "lastImagePrompt": "B", "videoPrompt": "" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Full lifecycle through the Status Endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn entry_reaches_ready_through_status_polls() {
    let app = TestApp::new();
    let id = app.create_entry().await;

    let response = app.post(&format!("/api/v1/entries/{id}/images")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "awaiting_images");
    assert_eq!(app.images.submissions(), 2);

    assert_eq!(app.status(&id).await, "awaiting_images");

    app.images.complete_all().await;
    assert_eq!(app.status(&id).await, "images_ready");
    assert_eq!(app.videos.submissions(), 1);
    assert_eq!(app.status(&id).await, "awaiting_video");

    app.videos.complete_all().await;
    assert_eq!(app.status(&id).await, "video_ready");
    assert_eq!(app.publisher.submissions(), 1);
    assert_eq!(app.publisher.media_urls().await, vec![fake_asset_url("vid-1")]);
    assert_eq!(app.status(&id).await, "awaiting_publish");

    let playback = fake_playback("asset-1");
    app.publisher
        .set_all(PublishStatus::Ready(playback.clone()))
        .await;

    let response = app.get(&format!("/api/v1/entries/{id}/status")).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ready");
    assert_eq!(json["data"]["playbackId"], playback.playback_id.as_str());
    assert_eq!(json["data"]["playbackUrl"], playback.playback_url.as_str());

    // Ready is terminal: more polls change nothing upstream.
    let polls = app.publisher.polls();
    assert_eq!(app.status(&id).await, "ready");
    assert_eq!(app.publisher.polls(), polls);
    assert_eq!(app.videos.submissions(), 1);
    assert_eq!(app.publisher.submissions(), 1);
}

#[tokio::test]
async fn failed_image_is_reported_with_stage_and_reason() {
    let app = TestApp::new();
    let id = app.create_entry().await;
    app.post(&format!("/api/v1/entries/{id}/images")).await;
    app.images
        .set_status("img-1", JobStatus::Failed { reason: "content policy".into() })
        .await;

    let response = app.get(&format!("/api/v1/entries/{id}/status")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "failed");
    assert_eq!(json["data"]["failedStage"], "first_image");
    assert_eq!(json["data"]["reason"], "content policy");
}

#[tokio::test]
async fn status_of_unknown_entry_is_404() {
    let app = TestApp::new();
    let response = app.get(&format!("/api/v1/entries/{MISSING_ID}/status")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_entry_id_is_400() {
    let app = TestApp::new();
    let response = app.get("/api/v1/entries/not-a-uuid/status").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Explicit initiators
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_video_before_images_is_409() {
    let app = TestApp::new();
    let id = app.create_entry().await;

    let response = app.post(&format!("/api/v1/entries/{id}/video")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
    assert_eq!(app.videos.submissions(), 0);
}

#[tokio::test]
async fn start_publish_before_video_is_409() {
    let app = TestApp::new();
    let id = app.create_entry().await;

    let response = app.post(&format!("/api/v1/entries/{id}/publish")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.publisher.submissions(), 0);
}

#[tokio::test]
async fn start_images_twice_submits_once() {
    let app = TestApp::new();
    let id = app.create_entry().await;

    for _ in 0..3 {
        let response = app.post(&format!("/api/v1/entries/{id}/images")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(app.images.submissions(), 2);
}

#[tokio::test]
async fn rejected_image_submission_fails_the_entry() {
    let app = TestApp::new();
    let id = app.create_entry().await;
    // The first image exhausts its two attempts.
    app.images.fail_next_submissions(2).await;

    let response = app.post(&format!("/api/v1/entries/{id}/images")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "failed");
    assert_eq!(json["data"]["failedStage"], "first_image");
    assert!(json["data"]["reason"]
        .as_str()
        .unwrap()
        .starts_with("submission_error: "));
    // The last image is never sent once the entry has failed.
    assert_eq!(app.images.submissions(), 2);

    let response = app.post(&format!("/api/v1/entries/{id}/images")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.images.submissions(), 2);
}

// ---------------------------------------------------------------------------
// Gallery
// ---------------------------------------------------------------------------

/// Drive a fresh entry all the way to ready and return its id.
async fn ready_entry(app: &TestApp) -> String {
    let id = app.create_entry().await;
    app.post(&format!("/api/v1/entries/{id}/images")).await;
    app.images.complete_all().await;
    app.status(&id).await;
    app.videos.complete_all().await;
    app.status(&id).await;
    let handles = app.publisher.handles().await;
    let handle = handles.last().unwrap();
    app.publisher
        .set_status(handle, PublishStatus::Ready(fake_playback(handle)))
        .await;
    assert_eq!(app.status(&id).await, "ready");
    id
}

#[tokio::test]
async fn gallery_lists_newest_first() {
    let app = TestApp::new();
    let older = app.create_entry().await;
    let newer = app.create_entry().await;

    let response = app.get("/api/v1/entries").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let items = json["data"].as_array().unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], newer.as_str());
    assert_eq!(items[1]["id"], older.as_str());
    assert_eq!(items[0]["firstImagePrompt"], "A");
    assert_eq!(items[0]["featured"], false);
}

#[tokio::test]
async fn gallery_limit_and_ready_filter() {
    let app = TestApp::new();
    let ready = ready_entry(&app).await;
    app.create_entry().await;

    let json = body_json(app.get("/api/v1/entries?limit=1").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let json = body_json(app.get("/api/v1/entries?ready=true").await).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], ready.as_str());
    assert!(items[0]["playbackUrl"].is_string());
}

#[tokio::test]
async fn only_ready_entries_can_be_featured() {
    let app = TestApp::new();
    let pending = app.create_entry().await;

    let response = app.post(&format!("/api/v1/entries/{pending}/featured")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let ready = ready_entry(&app).await;
    let response = app.post(&format!("/api/v1/entries/{ready}/featured")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["featured"], true);

    let json = body_json(app.get("/api/v1/entries?featured=true").await).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], ready.as_str());

    let response = app.delete(&format!("/api/v1/entries/{ready}/featured")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["featured"], false);

    let json = body_json(app.get("/api/v1/entries?featured=true").await).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unfeaturing_unknown_entry_is_404() {
    let app = TestApp::new();
    let response = app.delete(&format!("/api/v1/entries/{MISSING_ID}/featured")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
