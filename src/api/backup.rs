//! On-demand local backup endpoint (admin only).

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::engine::backup::run_backup;
use crate::AppState;

/// POST /api/backup
pub async fn trigger_backup(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&caller, Operation::RunBackup)?;

    let data_dir = state.config.server.data_dir.clone();
    let timestamp = tokio::task::spawn_blocking(move || run_backup(&data_dir))
        .await
        .map_err(|e| ApiError::internal(format!("Backup task failed: {e}")))?
        .map_err(|e| {
            tracing::error!(error = %e, "Backup failed");
            ApiError::internal("Backup failed")
        })?;

    Ok(Json(serde_json::json!({
        "message": "Backup created successfully",
        "timestamp": timestamp,
    })))
}
