//! HTTP API routes for the trace viewer
//!
//! Read-only JSON endpoints: the trace listing, raw and collapsed trace trees,
//! and rendered node details.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use trace_model::TraceNode;
use traceview::{collapse, CollapseCache, RenderConfig, Renderer};

use crate::reader::{ReaderError, TraceReader};

pub mod traces;

#[derive(Clone)]
pub struct ApiState {
    pub reader: Arc<dyn TraceReader>,
    pub renderer: Renderer,
    /// Display tree per storage id, memoized on the identity of the raw root
    display_trees: Arc<Mutex<HashMap<String, CollapseCache>>>,
}

impl ApiState {
    pub fn new(reader: Arc<dyn TraceReader>, render: RenderConfig) -> Self {
        Self {
            reader,
            renderer: Renderer::new(render),
            display_trees: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Collapsed tree of `root`; the transform runs off the async workers and
    /// outside the cache lock
    pub async fn display_tree(
        &self,
        storage_id: &str,
        root: Arc<TraceNode>,
    ) -> Result<Arc<TraceNode>, Response> {
        let cached = self
            .display_trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(storage_id)
            .and_then(|cache| cache.get(&root));
        if let Some(display) = cached {
            return Ok(display);
        }

        let raw = Arc::clone(&root);
        let display = tokio::task::spawn_blocking(move || Arc::new(collapse(&raw)))
            .await
            .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

        self.display_trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(storage_id.to_string())
            .or_default()
            .insert(&root, Arc::clone(&display));
        Ok(display)
    }
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/list", get(traces::list_traces))
        .route("/api/traces/{storage_id}", get(traces::get_trace))
        .route(
            "/api/traces/{storage_id}/display",
            get(traces::get_display_tree),
        )
        .route(
            "/api/traces/{storage_id}/nodes/{uid}",
            get(traces::get_node_detail).post(traces::post_node_detail),
        )
}

pub async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "trace-server",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub(crate) fn error_response(status: StatusCode, error: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": error.to_string()
        })),
    )
        .into_response()
}

pub(crate) fn reader_error(err: ReaderError) -> Response {
    let status = match &err {
        ReaderError::InvalidId(_) => StatusCode::BAD_REQUEST,
        ReaderError::NotFound(_) | ReaderError::MissingDir(_) => StatusCode::NOT_FOUND,
        ReaderError::Io(_) | ReaderError::Parse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "trace read failed");
    }
    error_response(status, err)
}
