use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dreamreel_core::error::CoreError;
use dreamreel_db::StoreError;
use dreamreel_pipeline::PipelineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain, store and pipeline errors. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `dreamreel_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An entry store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An error from the reconciler or a stage initiator.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

fn internal() -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Store(store) => classify_store_error(store),
            AppError::Pipeline(pipeline) => match pipeline {
                PipelineError::Core(core) => classify_core_error(core),
                PipelineError::Store(store) => classify_store_error(store),
                PipelineError::NotEligible { .. } => {
                    (StatusCode::CONFLICT, "CONFLICT", pipeline.to_string())
                }
                PipelineError::InvariantViolation(msg) => {
                    tracing::error!(error = %msg, "Pipeline invariant violated");
                    internal()
                }
            },
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> Classified {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

fn classify_store_error(err: &StoreError) -> Classified {
    match err {
        StoreError::Core(core) => classify_core_error(core),
        StoreError::Database(db) => classify_sqlx_error(db),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// `RowNotFound` maps to 404; everything else is a sanitized 500.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
