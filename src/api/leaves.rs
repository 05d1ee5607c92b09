//! Leave endpoints: requests and the admin status decision that drives
//! the vacation balance ledger.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::db::{
    CreateLeaveRequest, Leave, LeaveResponse, LeaveStatus, LeaveStatusRequest, LeaveType, User,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListLeavesQuery {
    pub user_id: Option<i64>,
}

/// List leaves. Admins see everyone's; a worker sees their own (the
/// user_id filter is forced to the caller for non-admins).
///
/// GET /api/leaves
pub async fn list_leaves(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ListLeavesQuery>,
) -> Result<Json<Vec<LeaveResponse>>, ApiError> {
    let filter = if caller.is_admin() {
        query.user_id
    } else {
        if let Some(user_id) = query.user_id {
            authorize(&caller, Operation::ViewLeavesOf(user_id))?;
        }
        Some(caller.id)
    };

    let rows = Leave::list(&state.db, filter).await?;
    Ok(Json(rows.into_iter().map(LeaveResponse::from).collect()))
}

/// POST /api/leaves
pub async fn create_leave(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<CreateLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveResponse>), ApiError> {
    authorize(&caller, Operation::RequestLeaveFor(req.user_id))?;

    let leave_type = LeaveType::parse(&req.leave_type)
        .ok_or_else(|| ApiError::bad_request("Invalid leave type"))?;
    if User::get(&state.db, req.user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let leave = Leave::create(&state.db, &req, leave_type).await?;

    tracing::info!(
        leave_id = leave.id,
        user_id = leave.user_id,
        days = leave.days_count,
        "Leave requested"
    );

    let row = Leave::get_row(&state.db, leave.id)
        .await?
        .ok_or_else(|| ApiError::internal("Leave vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// Set the status of a leave (admin only). Re-entrant: an earlier
/// decision may be corrected. The balance ledger effect happens inside
/// this call, atomically with the status change.
///
/// PUT /api/leaves/:id/status
pub async fn set_leave_status(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(leave_id): Path<i64>,
    Json(req): Json<LeaveStatusRequest>,
) -> Result<Json<LeaveResponse>, ApiError> {
    authorize(&caller, Operation::DecideLeaves)?;

    let status = LeaveStatus::parse(&req.status)
        .ok_or_else(|| ApiError::bad_request("Invalid leave status"))?;

    let leave = Leave::set_status(&state.db, leave_id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave not found"))?;

    tracing::info!(
        leave_id = leave.id,
        status = %leave.status,
        by = caller.id,
        "Leave status set"
    );

    let row = Leave::get_row(&state.db, leave.id)
        .await?
        .ok_or_else(|| ApiError::internal("Leave vanished after update"))?;
    Ok(Json(row.into()))
}
