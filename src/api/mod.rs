pub mod access;
mod alerts;
pub mod auth;
mod backup;
mod entries;
pub mod error;
mod export;
mod leaves;
mod sites;
mod stats;
mod users;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Auth
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        // Users (admin)
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/:id", put(users::update_user))
        .route("/users/:id", delete(users::delete_user))
        // Sites
        .route("/sites", get(sites::list_sites))
        .route("/sites", post(sites::create_site))
        .route("/sites/:id", get(sites::get_site))
        .route("/sites/:id", put(sites::update_site))
        .route("/sites/:id/members", post(sites::add_member))
        .route("/sites/:id/members", delete(sites::remove_member))
        .route("/sites/:id/entries", get(entries::list_site_entries))
        .route("/sites/:id/alerts", get(alerts::list_site_alerts))
        .route("/sites/:id/alerts", post(alerts::create_alert))
        .route("/sites/:id/plan", post(sites::upload_plan))
        .route("/sites/:id/plan", get(sites::download_plan))
        // Entries
        .route("/entries", post(entries::create_entry))
        .route("/entries/pending", get(entries::list_pending))
        .route("/entries/:id/validate", put(entries::validate_entry))
        .route("/entries/:id", put(entries::update_entry))
        .route("/entries/:id", delete(entries::delete_entry))
        // Leaves
        .route("/leaves", get(leaves::list_leaves))
        .route("/leaves", post(leaves::create_leave))
        .route("/leaves/:id/status", put(leaves::set_leave_status))
        // Alerts
        .route("/alerts/:id", put(alerts::update_alert))
        .route("/alerts/:id", delete(alerts::delete_alert))
        // Aggregation & admin tooling
        .route("/stats", get(stats::get_stats))
        .route("/export", get(export::export_entries))
        .route("/backup", post(backup::trigger_backup));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
