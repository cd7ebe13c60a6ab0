use std::sync::Arc;

use dreamreel_db::EntryStore;
use dreamreel_pipeline::Pipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Reconciler and stage initiators.
    pub pipeline: Arc<Pipeline>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, config: ServerConfig) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
        }
    }

    /// The entry store the pipeline writes to.
    pub fn store(&self) -> &Arc<dyn EntryStore> {
        self.pipeline.store()
    }
}
