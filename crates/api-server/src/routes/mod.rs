//! Route handlers

pub mod health;
pub mod presets;
pub mod runs;

use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use agent_runtime::RuntimeError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

fn route_error(status: StatusCode, message: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn missing_fields() -> RouteError {
    route_error(StatusCode::BAD_REQUEST, "Missing required fields")
}

pub fn run_not_found() -> RouteError {
    route_error(StatusCode::NOT_FOUND, "Run not found")
}

pub fn store_error(err: relay_core::Error) -> RouteError {
    use relay_core::Error;

    let status = match &err {
        Error::RunNotFound(_) => StatusCode::NOT_FOUND,
        Error::NoStoreConfigured | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::RunExists(_) | Error::VersionConflict { .. } => StatusCode::CONFLICT,
        Error::Backend { .. } | Error::Http(_) | Error::Serialization(_) => {
            error!("Store failure: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    route_error(status, err.to_string())
}

pub fn runtime_error(err: RuntimeError) -> RouteError {
    match err {
        RuntimeError::Store(e) => store_error(e),
        RuntimeError::RunNotFound { .. } => run_not_found(),
        other => {
            error!("Run failed: {}", other);
            route_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// Trimmed value of a required body field
pub fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use agent_runtime::{Completion, CompletionProvider, CompletionRequest, Result};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Response;
    use relay_core::preset::MemoryPresetCatalog;
    use relay_core::store::MemoryRunStore;
    use serde_json::Value;

    use crate::state::AppState;

    /// Replies with the last prompt message, prefixed
    pub struct EchoProvider;

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        fn provider_tag(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(Completion::text(format!("echo: {}", last)))
        }
    }

    pub fn memory_state() -> AppState {
        AppState::with_stores(
            Arc::new(EchoProvider),
            Arc::new(MemoryRunStore::in_memory()),
            Arc::new(MemoryPresetCatalog::new()),
        )
    }

    pub async fn json_body(response: Response<Body>) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
