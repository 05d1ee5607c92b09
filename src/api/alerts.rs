//! Site alert endpoints (admin managed, readable by anyone signed in).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::db::{Alert, CreateAlertRequest, Site, UpdateAlertRequest};
use crate::AppState;

/// GET /api/sites/:id/alerts
pub async fn list_site_alerts(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path(site_id): Path<i64>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    if Site::get(&state.db, site_id).await?.is_none() {
        return Err(ApiError::not_found("Site not found"));
    }
    Ok(Json(Alert::list_for_site(&state.db, site_id).await?))
}

/// POST /api/sites/:id/alerts
pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(site_id): Path<i64>,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    authorize(&caller, Operation::ManageAlerts)?;

    if Site::get(&state.db, site_id).await?.is_none() {
        return Err(ApiError::not_found("Site not found"));
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Alert title is required"));
    }

    let alert = Alert::create(&state.db, site_id, &req).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// PUT /api/alerts/:id
pub async fn update_alert(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(alert_id): Path<i64>,
    Json(req): Json<UpdateAlertRequest>,
) -> Result<Json<Alert>, ApiError> {
    authorize(&caller, Operation::ManageAlerts)?;

    let mut alert = Alert::get(&state.db, alert_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Alert not found"))?;

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("Alert title is required"));
        }
        alert.title = title;
    }
    if req.description.is_some() {
        alert.description = req.description;
    }
    if req.due_date.is_some() {
        alert.due_date = req.due_date;
    }
    if let Some(is_resolved) = req.is_resolved {
        alert.is_resolved = is_resolved;
    }

    Ok(Json(Alert::update(&state.db, &alert).await?))
}

/// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(alert_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&caller, Operation::ManageAlerts)?;

    if !Alert::delete(&state.db, alert_id).await? {
        return Err(ApiError::not_found("Alert not found"));
    }

    Ok(Json(serde_json::json!({ "message": "Alert deleted" })))
}
