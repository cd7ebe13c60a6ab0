//! Explicit stage initiators.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use dreamreel_core::entry::{Resolution, Stage};
use dreamreel_core::error::CoreError;
use dreamreel_core::status::PipelineStatus;
use dreamreel_db::EntryStore;
use dreamreel_pipeline::{PipelineError, StartOutcome};
use dreamreel_providers::JobStatus;

#[tokio::test]
async fn ensure_started_fires_once() {
    let h = Harness::new();
    let id = h.create().await;

    assert_eq!(
        h.pipeline.ensure_started(id, Stage::FirstImage).await.unwrap(),
        StartOutcome::Started
    );
    assert_eq!(
        h.pipeline.ensure_started(id, Stage::FirstImage).await.unwrap(),
        StartOutcome::AlreadyStarted
    );
    assert_eq!(h.images.submissions(), 1);
    assert_eq!(h.entry(id).await.handle(Stage::FirstImage), Some("img-1"));
}

#[tokio::test]
async fn start_images_is_idempotent() {
    let h = Harness::new();
    let id = h.create().await;

    let snap = h.pipeline.start_images(id).await.unwrap();
    assert_eq!(snap.status, PipelineStatus::AwaitingImages);
    h.pipeline.start_images(id).await.unwrap();

    assert_eq!(h.images.submissions(), 2);
    let prompts: Vec<String> = h
        .images
        .requests()
        .await
        .iter()
        .map(|r| r.prompt().to_string())
        .collect();
    assert!(prompts.contains(&"A".to_string()));
    assert!(prompts.contains(&"B".to_string()));
}

#[tokio::test]
async fn start_images_skips_last_image_once_first_fails() {
    let h = Harness::new();
    let id = h.create().await;
    h.images.fail_next_submissions(3).await;

    let snap = h.pipeline.start_images(id).await.unwrap();
    assert_eq!(snap.status, PipelineStatus::Failed);
    assert_eq!(snap.failed_stage, Some(Stage::FirstImage));
    assert_eq!(h.images.submissions(), 3);
    assert!(!h.entry(id).await.is_started(Stage::LastImage));

    let again = h.pipeline.start_images(id).await.unwrap();
    assert_eq!(again, snap);
    assert_eq!(h.images.submissions(), 3);
}

#[tokio::test]
async fn start_video_before_images_is_not_eligible() {
    let h = Harness::new();
    let id = h.create().await;
    h.pipeline.start_images(id).await.unwrap();

    let result = h.pipeline.start_video(id).await;
    assert_matches!(result, Err(PipelineError::NotEligible { stage: Stage::Video, .. }));
    assert_eq!(h.videos.submissions(), 0);
}

#[tokio::test]
async fn start_video_once_images_are_stored() {
    let h = Harness::new();
    let id = h.create().await;
    let now = chrono::Utc::now();
    for (stage, url) in [(Stage::FirstImage, "https://a"), (Stage::LastImage, "https://b")] {
        h.store.claim_stage(id, stage, now).await.unwrap().unwrap();
        h.store
            .resolve_stage(id, stage, &Resolution::Url(url.into()))
            .await
            .unwrap()
            .unwrap();
    }

    let snap = h.pipeline.start_video(id).await.unwrap();
    assert_eq!(snap.status, PipelineStatus::AwaitingVideo);
    assert_eq!(h.videos.submissions(), 1);

    let again = h.pipeline.start_video(id).await.unwrap();
    assert_eq!(again, snap);
    assert_eq!(h.videos.submissions(), 1);
}

#[tokio::test]
async fn start_publish_requires_video_url() {
    let h = Harness::new();
    let id = h.entry_with_images().await;
    h.pipeline.reconcile(id).await.unwrap();

    let result = h.pipeline.start_publish(id).await;
    assert_matches!(result, Err(PipelineError::NotEligible { stage: Stage::Publish, .. }));
}

#[tokio::test]
async fn starting_after_failure_is_not_eligible() {
    let h = Harness::new();
    let id = h.create().await;
    h.pipeline.ensure_started(id, Stage::FirstImage).await.unwrap();
    h.images
        .set_all(JobStatus::Failed { reason: "content policy".into() })
        .await;
    h.pipeline.reconcile(id).await.unwrap();

    let result = h.pipeline.ensure_started(id, Stage::LastImage).await;
    assert_matches!(result, Err(PipelineError::NotEligible { stage: Stage::LastImage, .. }));
}

#[tokio::test]
async fn initiators_on_unknown_entry_are_not_found() {
    let h = Harness::new();
    let id = dreamreel_core::types::new_entry_id();
    assert_matches!(
        h.pipeline.start_images(id).await,
        Err(PipelineError::Core(CoreError::NotFound { .. }))
    );
}

#[tokio::test]
async fn invalid_prompts_are_rejected() {
    let h = Harness::new();
    let result = h.pipeline.create_entry("  ", "B", "C").await;
    assert_matches!(result, Err(PipelineError::Core(CoreError::Validation(_))));
}
