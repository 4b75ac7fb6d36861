//! Fleet-wide aspect handlers for the REST API.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use robots_core::aspect::AspectReport;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestContext};
use crate::state::AppState;

/// Body for `POST /api/v1/aspects`.
#[derive(Debug, Deserialize)]
pub struct AddAspectRequest {
    pub name: String,
    /// Raw default value; null when omitted.
    #[serde(default)]
    pub default: Option<String>,
}

/// POST /api/v1/aspects - Add an aspect to every robot.
///
/// Per-robot rejections are part of the report, not an error.
pub async fn add_aspect(
    State(state): State<AppState>,
    Json(body): Json<AddAspectRequest>,
) -> Result<Json<ApiResponse<AspectReport>>, AppError> {
    let ctx = RequestContext::start();
    let report = state
        .fleet_manager
        .add_aspect(&body.name, body.default.as_deref())
        .await?;
    Ok(Json(ctx.success(report)))
}

/// DELETE /api/v1/aspects/{name} - Remove an aspect from every robot.
pub async fn remove_aspect(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<AspectReport>>, AppError> {
    let ctx = RequestContext::start();
    let report = state.fleet_manager.remove_aspect(&name).await?;
    Ok(Json(ctx.success(report)))
}
