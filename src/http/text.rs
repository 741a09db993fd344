//! Root, health, media summary and grounded query endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::error::RelayError;
use crate::gateway::{GroundingOptions, DEFAULT_SUMMARY_PROMPT};
use crate::params::{validate_media_uri, validate_required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SummarizeRequest {
    #[serde(alias = "youtube_url", alias = "media_uri")]
    media_uri: String,
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SummarizeQuery {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GroundingRequest {
    query: String,
    #[serde(default = "default_true", alias = "use_search", alias = "use_google_search")]
    use_search: bool,
    #[serde(default = "default_true", alias = "use_url_context")]
    use_url_context: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub(super) struct SummaryResponse {
    summary: String,
}

pub(super) async fn root() -> Json<Value> {
    Json(json!({
        "message": "Gemini relay API: media summaries, grounded search, documents and images",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub(super) async fn summarize(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, RelayError> {
    state.gateway.gate().verify()?;
    let Json(request) = payload.map_err(|e| RelayError::InvalidArgument(e.body_text()))?;

    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUMMARY_PROMPT.to_string());
    summarize_uri(&state, &request.media_uri, &prompt).await
}

pub(super) async fn summarize_query(
    State(state): State<AppState>,
    query: Result<Query<SummarizeQuery>, QueryRejection>,
) -> Result<Json<SummaryResponse>, RelayError> {
    state.gateway.gate().verify()?;
    let Query(query) = query.map_err(|e| RelayError::InvalidArgument(e.body_text()))?;
    summarize_uri(&state, &query.url, DEFAULT_SUMMARY_PROMPT).await
}

async fn summarize_uri(
    state: &AppState,
    media_uri: &str,
    prompt: &str,
) -> Result<Json<SummaryResponse>, RelayError> {
    let url = validate_media_uri(media_uri).map_err(RelayError::InvalidArgument)?;
    let summary = state.gateway.summarize_media(url.as_str(), prompt).await?;
    Ok(Json(SummaryResponse { summary }))
}

pub(super) async fn grounding(
    State(state): State<AppState>,
    payload: Result<Json<GroundingRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, RelayError> {
    state.gateway.gate().verify()?;
    let Json(request) = payload.map_err(|e| RelayError::InvalidArgument(e.body_text()))?;
    validate_required("query", &request.query).map_err(RelayError::InvalidArgument)?;

    let options = GroundingOptions {
        use_search: request.use_search,
        use_url_context: request.use_url_context,
    };
    let summary = state.gateway.grounded_query(&request.query, options).await?;
    Ok(Json(SummaryResponse { summary }))
}
