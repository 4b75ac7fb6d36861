//! Robot handlers for the REST API.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use robots_core::query::RobotTable;
use robots_core::service::manager::ListRequest;
use robots_types::robot::{CreateRobotRequest, Robot, RobotRecord, RobotStatus};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestContext};
use crate::state::AppState;

/// Query keys that configure a listing instead of filtering it.
const DETAILED_PARAM: &str = "detailed";
const SORT_PARAM: &str = "sort_by";

/// Split list query parameters into options and attribute filters.
///
/// `detailed` and `sort_by` are reserved; every other key is an
/// `attribute=value` filter.
pub fn list_request_from_query(
    mut params: BTreeMap<String, String>,
) -> Result<ListRequest, AppError> {
    let detailed = match params.remove(DETAILED_PARAM) {
        None => false,
        Some(raw) => robots_types::robot::parse_bool(&raw).ok_or_else(|| {
            AppError::Validation(format!("'{DETAILED_PARAM}' must be true or false, got '{raw}'"))
        })?,
    };
    let sort_by = params.remove(SORT_PARAM).filter(|s| !s.is_empty());

    Ok(ListRequest {
        filters: params,
        detailed,
        sort_by,
    })
}

/// Flatten a JSON edit body into raw strings for the manager.
pub fn updates_from_json(
    body: BTreeMap<String, serde_json::Value>,
) -> Result<BTreeMap<String, String>, AppError> {
    body.into_iter()
        .map(|(key, value)| {
            let raw = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Null => String::new(),
                other => {
                    return Err(AppError::Validation(format!(
                        "'{key}' must be a string, boolean, number or null, got {other}"
                    )));
                }
            };
            Ok((key, raw))
        })
        .collect()
}

/// POST /api/v1/robots - Register a robot.
pub async fn create_robot(
    State(state): State<AppState>,
    Json(body): Json<CreateRobotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Robot>>), AppError> {
    let ctx = RequestContext::start();
    let robot = state.fleet_manager.create_robot(body).await?;

    let href = format!("/api/v1/robots/{}", robot.name());
    let resp = ctx.success(robot).with_link("self", &href);
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/robots - List robots with filtering, sorting and projection.
pub async fn list_robots(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ApiResponse<RobotTable>>, AppError> {
    let ctx = RequestContext::start();
    let request = list_request_from_query(params)?;

    let listing = state.fleet_manager.list_robots(&request).await?;
    let warnings: Vec<String> = listing.warnings.iter().map(ToString::to_string).collect();

    let resp = ctx
        .success(listing.table)
        .with_warnings(warnings)
        .with_link("self", "/api/v1/robots");
    Ok(Json(resp))
}

/// GET /api/v1/robots/{name} - The robot's flattened record.
pub async fn get_robot(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<RobotRecord>>, AppError> {
    let ctx = RequestContext::start();
    let record = state.fleet_manager.inspect_robot(&name).await?;

    let resp = ctx
        .success(record)
        .with_link("self", &format!("/api/v1/robots/{name}"))
        .with_link("status", &format!("/api/v1/robots/{name}/status"));
    Ok(Json(resp))
}

/// PATCH /api/v1/robots/{name} - Update attributes and aspects.
pub async fn update_robot(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<BTreeMap<String, serde_json::Value>>,
) -> Result<Json<ApiResponse<Robot>>, AppError> {
    let ctx = RequestContext::start();
    let updates = updates_from_json(body)?;
    if updates.is_empty() {
        return Err(AppError::Validation("no attributes to update".to_string()));
    }

    let robot = state.fleet_manager.edit_robot(&name, updates).await?;
    let resp = ctx
        .success(robot)
        .with_link("self", &format!("/api/v1/robots/{name}"));
    Ok(Json(resp))
}

/// DELETE /api/v1/robots/{name} - Permanently delete a robot.
pub async fn delete_robot(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let ctx = RequestContext::start();
    state.fleet_manager.delete_robot(&name).await?;

    let resp = ctx.success(serde_json::json!({"deleted": true, "name": name}));
    Ok(Json(resp))
}

/// GET /api/v1/robots/{name}/status - Status and location.
pub async fn get_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<RobotStatus>>, AppError> {
    let ctx = RequestContext::start();
    let status = state.fleet_manager.get_status(&name).await?;
    Ok(Json(ctx.success(status)))
}
