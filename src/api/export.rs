//! CSV export endpoint (admin only).

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::db::{Entry, Site};
use crate::engine::export::{build_rows, filename, ExportFilter, Semester};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub site_id: Option<i64>,
    pub year: Option<i32>,
    pub semester: Option<String>,
}

/// GET /api/export?site_id=&year=&semester=
pub async fn export_entries(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ExportEntries)?;

    let semester = match query.semester.as_deref() {
        None => None,
        Some(s) => Some(
            Semester::parse(s).ok_or_else(|| ApiError::bad_request("Invalid semester"))?,
        ),
    };
    let filter = ExportFilter {
        site_id: query.site_id,
        year: query.year,
        semester,
    };

    let entries = Entry::list_all_rows(&state.db).await?;
    let rows = build_rows(&entries, &filter);

    let site_name = match filter.site_id {
        Some(site_id) => Site::get(&state.db, site_id).await?.map(|s| s.name),
        None => None,
    };
    let attachment = filename(&filter, site_name.as_deref());

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["ID", "Date", "Site", "Worker", "Hours", "Material", "Status"])
        .map_err(|e| ApiError::internal(format!("CSV rendering failed: {e}")))?;
    for row in &rows {
        writer
            .write_record(&[
                row.id.to_string(),
                row.date.clone(),
                row.site.clone(),
                row.worker.clone(),
                row.hours.to_string(),
                row.material.to_string(),
                row.status.clone(),
            ])
            .map_err(|e| ApiError::internal(format!("CSV rendering failed: {e}")))?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("CSV rendering failed: {e}")))?;

    tracing::info!(rows = rows.len(), file = %attachment, "Entries exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{attachment}\""),
            ),
        ],
        body,
    ))
}
