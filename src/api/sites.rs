//! Site endpoints: CRUD, membership, and the plan document attachment.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::db::{
    CreateSiteRequest, MemberRequest, Site, SiteResponse, SiteStatus, UpdateSiteRequest, User,
};
use crate::storage::PlanStoreError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSitesQuery {
    pub status: Option<String>,
}

/// List sites. Visible to any authenticated caller; when
/// `access.member_scoped_reads` is on, workers only see sites they are
/// members of.
///
/// GET /api/sites
pub async fn list_sites(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ListSitesQuery>,
) -> Result<Json<Vec<SiteResponse>>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("ALL") => None,
        Some(status) => Some(
            SiteStatus::parse(status)
                .ok_or_else(|| ApiError::bad_request("Invalid site status"))?,
        ),
    };

    let member_of = if state.config.access.member_scoped_reads && !caller.is_admin() {
        Some(caller.id)
    } else {
        None
    };

    let sites = Site::list(&state.db, status.map(|s| s.as_str()), member_of).await?;

    let mut responses = Vec::with_capacity(sites.len());
    for site in sites {
        responses.push(site.into_response(&state.db).await?);
    }
    Ok(Json(responses))
}

/// GET /api/sites/:id
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path(site_id): Path<i64>,
) -> Result<Json<SiteResponse>, ApiError> {
    let site = Site::get(&state.db, site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;
    Ok(Json(site.into_response(&state.db).await?))
}

/// POST /api/sites
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<SiteResponse>), ApiError> {
    authorize(&caller, Operation::ManageSites)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Site name is required"));
    }
    if let Some(status) = &req.status {
        if SiteStatus::parse(status).is_none() {
            return Err(ApiError::bad_request("Invalid site status"));
        }
    }

    let site = Site::create(&state.db, &req).await?;
    for user_id in &req.members {
        // Unknown initial members are skipped, matching add_member.
        Site::add_member(&state.db, site.id, *user_id).await?;
    }

    tracing::info!(site = %site.name, "Site created");

    let response = site.into_response(&state.db).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/sites/:id
pub async fn update_site(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(site_id): Path<i64>,
    Json(req): Json<UpdateSiteRequest>,
) -> Result<Json<SiteResponse>, ApiError> {
    authorize(&caller, Operation::ManageSites)?;

    let mut site = Site::get(&state.db, site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Site name is required"));
        }
        site.name = name;
    }
    if let Some(year) = req.year {
        site.year = year;
    }
    if let Some(status) = req.status {
        // Status is set directly by the admin; nothing is inferred from
        // the start and end dates.
        let status = SiteStatus::parse(&status)
            .ok_or_else(|| ApiError::bad_request("Invalid site status"))?;
        site.status = status.as_str().to_string();
    }
    if req.address_work.is_some() {
        site.address_work = req.address_work;
    }
    if req.address_billing.is_some() {
        site.address_billing = req.address_billing;
    }
    if req.date_start.is_some() {
        site.date_start = req.date_start;
    }
    if req.date_end.is_some() {
        site.date_end = req.date_end;
    }
    if req.notes.is_some() {
        site.notes = req.notes;
    }

    let updated = Site::update(&state.db, &site).await?;
    Ok(Json(updated.into_response(&state.db).await?))
}

/// POST /api/sites/:id/members
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(site_id): Path<i64>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<SiteResponse>, ApiError> {
    authorize(&caller, Operation::ManageMembers)?;

    let site = Site::get(&state.db, site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    if !Site::add_member(&state.db, site.id, req.user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(site.into_response(&state.db).await?))
}

/// DELETE /api/sites/:id/members
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(site_id): Path<i64>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<SiteResponse>, ApiError> {
    authorize(&caller, Operation::ManageMembers)?;

    let site = Site::get(&state.db, site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    if User::get(&state.db, req.user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    Site::remove_member(&state.db, site.id, req.user_id).await?;
    Ok(Json(site.into_response(&state.db).await?))
}

/// Upload the plan document for a site. One PDF per site, overwritten on
/// re-upload.
///
/// POST /api/sites/:id/plan
pub async fn upload_plan(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(site_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<SiteResponse>, ApiError> {
    authorize(&caller, Operation::UploadPlan)?;

    let site = Site::get(&state.db, site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    let field = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
        .ok_or_else(|| ApiError::bad_request("Missing file field"))?;

    let bytes = field
        .bytes()
        .await
        .map_err(|_| ApiError::bad_request("Failed to read uploaded file"))?;

    let name = match state.plans.save(site.id, &bytes) {
        Ok(name) => name,
        Err(PlanStoreError::NotPdf) => {
            return Err(ApiError::bad_request("Plan document must be a PDF"))
        }
        Err(e) => {
            tracing::error!(site_id, error = %e, "Failed to store plan document");
            return Err(ApiError::internal("Failed to store plan document"));
        }
    };

    Site::set_plan_path(&state.db, site.id, &name).await?;
    tracing::info!(site_id, plan = %name, "Plan document uploaded");

    let site = Site::get(&state.db, site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;
    Ok(Json(site.into_response(&state.db).await?))
}

/// Download the plan document for a site.
///
/// GET /api/sites/:id/plan
pub async fn download_plan(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path(site_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let site = Site::get(&state.db, site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    let name = site
        .plan_path
        .ok_or_else(|| ApiError::not_found("No plan document for this site"))?;

    let bytes = match state.plans.load(&name) {
        Ok(bytes) => bytes,
        Err(PlanStoreError::NotFound | PlanStoreError::InvalidPath) => {
            return Err(ApiError::not_found("Plan document not found"))
        }
        Err(e) => {
            tracing::error!(site_id, error = %e, "Failed to read plan document");
            return Err(ApiError::internal("Failed to read plan document"));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        bytes,
    ))
}
