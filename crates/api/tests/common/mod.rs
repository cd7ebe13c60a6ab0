//! Shared fixtures: the full application router over the in-memory store
//! and fake providers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use dreamreel_api::config::{ServerConfig, StoreKind};
use dreamreel_api::router::build_app_router;
use dreamreel_api::state::AppState;
use dreamreel_db::MemoryEntryStore;
use dreamreel_events::EventBus;
use dreamreel_pipeline::{Pipeline, PipelineConfig, RetryPolicy};
use dreamreel_providers::fake::{FakeJobClient, FakePublisher};
use dreamreel_providers::Providers;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const ORIGIN: &str = "http://localhost:3001";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![ORIGIN.to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 1,
        entry_store: StoreKind::Memory,
    }
}

/// The application plus handles on its fake providers.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryEntryStore>,
    pub images: Arc<FakeJobClient>,
    pub videos: Arc<FakeJobClient>,
    pub publisher: Arc<FakePublisher>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryEntryStore::new());
        let images = Arc::new(FakeJobClient::new("img"));
        let videos = Arc::new(FakeJobClient::new("vid"));
        let publisher = Arc::new(FakePublisher::new());

        let providers = Providers {
            images: images.clone(),
            videos: videos.clone(),
            publisher: publisher.clone(),
        };
        let pipeline_config = PipelineConfig {
            retry: RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(2),
                multiplier: 2.0,
            },
            ..PipelineConfig::default()
        };
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            providers,
            Arc::new(EventBus::default()),
            pipeline_config,
        ));

        let config = test_config();
        let router = build_app_router(AppState::new(pipeline, config.clone()), &config);

        Self {
            router,
            store,
            images,
            videos,
            publisher,
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        self.send(Method::POST, uri, None).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Method::DELETE, uri, None).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Create an entry with prompts A / B / C and return its id.
    pub async fn create_entry(&self) -> String {
        let response = self
            .post_json(
                "/api/v1/entries",
                serde_json::json!({
                    "firstImagePrompt": "A",
                    "lastImagePrompt": "B",
                    "videoPrompt": "C",
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        json["data"]["entryId"].as_str().unwrap().to_string()
    }

    /// GET the Status Endpoint and return `data.status`.
    pub async fn status(&self, id: &str) -> String {
        let response = self.get(&format!("/api/v1/entries/{id}/status")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        json["data"]["status"].as_str().unwrap().to_string()
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
