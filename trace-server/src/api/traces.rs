//! Trace endpoints

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use trace_model::TraceNode;
use traceview::{node_detail, sort_summaries, DisclosureState};

use crate::api::{error_response, reader_error, ApiState};

/// Disclosure state sent by the client, keyed by entry index
#[derive(Debug, Default, Deserialize)]
pub struct NodeDetailRequest {
    #[serde(default)]
    pub expanded: BTreeMap<usize, Vec<String>>,
}

async fn load_trace(state: &ApiState, storage_id: String) -> Result<Arc<TraceNode>, Response> {
    let reader = Arc::clone(&state.reader);
    tokio::task::spawn_blocking(move || reader.read_trace(&storage_id))
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .map_err(reader_error)
}

pub async fn list_traces(State(state): State<ApiState>) -> Result<Response, Response> {
    let reader = Arc::clone(&state.reader);
    let mut summaries = tokio::task::spawn_blocking(move || reader.list_summaries())
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .map_err(reader_error)?;
    sort_summaries(&mut summaries);
    Ok(Json(summaries).into_response())
}

pub async fn get_trace(
    State(state): State<ApiState>,
    Path(storage_id): Path<String>,
) -> Result<Response, Response> {
    let root = load_trace(&state, storage_id).await?;
    Ok(Json(root.as_ref()).into_response())
}

pub async fn get_display_tree(
    State(state): State<ApiState>,
    Path(storage_id): Path<String>,
) -> Result<Response, Response> {
    let root = load_trace(&state, storage_id.clone()).await?;
    let display = state.display_tree(&storage_id, root).await?;
    Ok(Json(display.as_ref()).into_response())
}

pub async fn get_node_detail(
    State(state): State<ApiState>,
    Path((storage_id, uid)): Path<(String, String)>,
) -> Result<Response, Response> {
    render_node_detail(&state, storage_id, &uid, NodeDetailRequest::default()).await
}

pub async fn post_node_detail(
    State(state): State<ApiState>,
    Path((storage_id, uid)): Path<(String, String)>,
    Json(request): Json<NodeDetailRequest>,
) -> Result<Response, Response> {
    render_node_detail(&state, storage_id, &uid, request).await
}

async fn render_node_detail(
    state: &ApiState,
    storage_id: String,
    uid: &str,
    request: NodeDetailRequest,
) -> Result<Response, Response> {
    let root = load_trace(state, storage_id.clone()).await?;
    let display = state.display_tree(&storage_id, root).await?;
    let Some(node) = display.find(uid) else {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Node {uid} not found in trace {storage_id}"),
        ));
    };

    let disclosures: BTreeMap<usize, DisclosureState> = request
        .expanded
        .into_iter()
        .map(|(entry, paths)| (entry, DisclosureState::from_paths(paths)))
        .collect();
    let detail = node_detail(node, &state.renderer, &disclosures);
    tracing::debug!(
        storage_id = %storage_id,
        uid,
        entries = detail.entries.len(),
        "rendered node detail"
    );
    Ok(Json(detail).into_response())
}
