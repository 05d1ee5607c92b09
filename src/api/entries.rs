//! Entry endpoints: creation, validation, correction and deletion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::db::{
    CreateEntryRequest, Entry, EntryResponse, EntryStatus, Site, UpdateEntryRequest, User,
};
use crate::AppState;

/// List all entries of a site. Any authenticated caller may read; when
/// `access.member_scoped_reads` is on, workers only see their own rows.
///
/// GET /api/sites/:id/entries
pub async fn list_site_entries(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(site_id): Path<i64>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    if Site::get(&state.db, site_id).await?.is_none() {
        return Err(ApiError::not_found("Site not found"));
    }

    let scope = if state.config.access.member_scoped_reads && !caller.is_admin() {
        Some(caller.id)
    } else {
        None
    };

    let rows = Entry::list_for_site(&state.db, site_id, scope).await?;
    Ok(Json(rows.into_iter().map(EntryResponse::from).collect()))
}

/// Create an entry. Workers may only record time attributed to
/// themselves; admins may record on behalf of anyone. The stored status
/// is always PENDING no matter what the request says.
///
/// POST /api/entries
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    authorize(&caller, Operation::RecordEntryFor(req.user_id))?;

    if req.hours < 0.0 || req.material_cost < 0.0 {
        return Err(ApiError::bad_request(
            "Hours and material cost must not be negative",
        ));
    }
    if Site::get(&state.db, req.site_id).await?.is_none() {
        return Err(ApiError::not_found("Site not found"));
    }
    if User::get(&state.db, req.user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let entry = Entry::create(&state.db, &req, caller.id).await?;

    tracing::info!(
        entry_id = entry.id,
        user_id = entry.user_id,
        created_by = caller.id,
        "Entry recorded"
    );

    let row = Entry::get_row(&state.db, entry.id)
        .await?
        .ok_or_else(|| ApiError::internal("Entry vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// List entries awaiting validation (admin only).
///
/// GET /api/entries/pending
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    authorize(&caller, Operation::ValidateEntries)?;

    let rows = Entry::list_pending(&state.db).await?;
    Ok(Json(rows.into_iter().map(EntryResponse::from).collect()))
}

/// The one-way PENDING -> VALIDATED transition.
///
/// PUT /api/entries/:id/validate
pub async fn validate_entry(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(entry_id): Path<i64>,
) -> Result<Json<EntryResponse>, ApiError> {
    authorize(&caller, Operation::ValidateEntries)?;

    let entry = Entry::validate(&state.db, entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Entry not found"))?;

    tracing::info!(entry_id = entry.id, by = caller.id, "Entry validated");

    let row = Entry::get_row(&state.db, entry.id)
        .await?
        .ok_or_else(|| ApiError::internal("Entry vanished after update"))?;
    Ok(Json(row.into()))
}

/// Admin correction of an entry. The stored status is preserved unless
/// the request supplies one explicitly: editing after validation does
/// not silently bounce the entry back to PENDING.
///
/// PUT /api/entries/:id
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(entry_id): Path<i64>,
    Json(req): Json<UpdateEntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    authorize(&caller, Operation::EditEntries)?;

    let mut entry = Entry::get(&state.db, entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Entry not found"))?;

    if let Some(date) = req.date {
        entry.date = date;
    }
    if let Some(hours) = req.hours {
        if hours < 0.0 {
            return Err(ApiError::bad_request("Hours must not be negative"));
        }
        entry.hours = hours;
    }
    if let Some(material_cost) = req.material_cost {
        if material_cost < 0.0 {
            return Err(ApiError::bad_request("Material cost must not be negative"));
        }
        entry.material_cost = material_cost;
    }
    if let Some(status) = req.status {
        let status = EntryStatus::parse(&status)
            .ok_or_else(|| ApiError::bad_request("Invalid entry status"))?;
        entry.status = status.as_str().to_string();
    }

    let updated = Entry::update(&state.db, &entry).await?;

    let row = Entry::get_row(&state.db, updated.id)
        .await?
        .ok_or_else(|| ApiError::internal("Entry vanished after update"))?;
    Ok(Json(row.into()))
}

/// DELETE /api/entries/:id
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(entry_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&caller, Operation::DeleteEntries)?;

    if !Entry::delete(&state.db, entry_id).await? {
        return Err(ApiError::not_found("Entry not found"));
    }

    tracing::info!(entry_id, by = caller.id, "Entry deleted");
    Ok(Json(serde_json::json!({ "message": "Entry deleted" })))
}
