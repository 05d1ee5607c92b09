//! Global statistics endpoint (admin only).

use axum::{extract::State, Json};
use chrono::Datelike;
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::db::{Entry, Site};
use crate::engine::stats::{compute_stats, Stats};
use crate::AppState;

/// GET /api/stats
///
/// Full-table fold over the entries; volumes are small enough that this
/// runs synchronously per request.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Stats>, ApiError> {
    authorize(&caller, Operation::ViewStats)?;

    let entries = Entry::list_all(&state.db).await?;
    let active_sites = Site::active_count(&state.db).await?;
    let current_year = chrono::Local::now().year();

    Ok(Json(compute_stats(&entries, active_sites, current_year)))
}
