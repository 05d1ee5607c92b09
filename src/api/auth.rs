//! PIN login and opaque session tokens.
//!
//! Login is by 6-digit PIN alone; the PIN uniquely identifies the user.
//! A successful login issues a random bearer token whose SHA-256 hash is
//! stored in the sessions table with an expiry.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::db::{DbPool, LoginRequest, LoginResponse, Session, User};
use crate::AppState;

/// Generate a random bearer token.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 6 && pin.chars().all(|c| c.is_ascii_digit())
}

/// Login endpoint.
///
/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !is_valid_pin(&request.pin) {
        return Err(ApiError::bad_request("PIN must be exactly 6 digits"));
    }

    let user = User::find_by_pin(&state.db, &request.pin)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid PIN"))?;

    let token = issue_session(&state.db, user.id, state.config.auth.session_ttl_days).await?;

    tracing::info!(user = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Logout endpoint: revokes the presented session.
///
/// POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&state.db)
            .await?;
    }
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

pub async fn issue_session(db: &DbPool, user_id: i64, ttl_days: i64) -> Result<String, ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let expires_at = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(ttl_days))
        .ok_or_else(|| ApiError::internal("Session expiry overflow"))?
        .to_rfc3339();

    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO sessions (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session_id)
        .bind(user_id)
        .bind(&token_hash)
        .bind(&expires_at)
        .execute(db)
        .await?;

    Ok(token)
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let header = headers.get("Authorization")?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
        .or_else(|| Some(header.to_string()))
}

/// Resolve a bearer token to its user, rejecting expired sessions.
pub async fn get_current_user(db: &DbPool, token: &str) -> Result<User, ApiError> {
    let token_hash = hash_token(token);
    let session: Option<Session> =
        sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(&token_hash)
            .bind(chrono::Utc::now().to_rfc3339())
            .fetch_optional(db)
            .await?;

    let session = session.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    User::get(db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))
}

/// The authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing credentials"))?;
        let user = get_current_user(&state.db, &token).await?;
        Ok(AuthUser(user))
    }
}

/// Create the bootstrap admin account when no admin exists yet.
///
/// The fixed, well-known PIN is a deliberate operational default so a
/// fresh install is reachable; it is not a security recommendation.
/// Change it right after the first login.
pub async fn ensure_admin_user(db: &DbPool, bootstrap_pin: &str) -> anyhow::Result<()> {
    if User::admin_count(db).await? > 0 {
        return Ok(());
    }

    User::create(db, "Admin", bootstrap_pin, crate::db::Role::Admin, 0.0).await?;
    tracing::warn!(
        "Created default admin user with PIN {} - change this PIN immediately",
        bootstrap_pin
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn pin_format() {
        assert!(is_valid_pin("000000"));
        assert!(is_valid_pin("123456"));
        assert!(!is_valid_pin("12345"));
        assert!(!is_valid_pin("1234567"));
        assert!(!is_valid_pin("12345a"));
        assert!(!is_valid_pin(""));
    }

    #[test]
    fn tokens_are_unique_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(hash_token(&a), a);
        assert_eq!(hash_token(&a), hash_token(&a));
    }

    #[tokio::test]
    async fn session_roundtrip() {
        let db = test_pool().await;
        let user = User::create(&db, "anna", "111111", crate::db::Role::Worker, 0.0)
            .await
            .unwrap();

        let token = issue_session(&db, user.id, 7).await.unwrap();
        let resolved = get_current_user(&db, &token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        assert!(get_current_user(&db, "not-a-token").await.is_err());
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let db = test_pool().await;
        let user = User::create(&db, "anna", "111111", crate::db::Role::Worker, 0.0)
            .await
            .unwrap();

        let token = issue_session(&db, user.id, -1).await.unwrap();
        assert!(get_current_user(&db, &token).await.is_err());
    }

    #[tokio::test]
    async fn bootstrap_admin_created_once() {
        let db = test_pool().await;
        ensure_admin_user(&db, "000000").await.unwrap();
        ensure_admin_user(&db, "000000").await.unwrap();
        assert_eq!(User::admin_count(&db).await.unwrap(), 1);

        let admin = User::find_by_pin(&db, "000000").await.unwrap().unwrap();
        assert!(admin.is_admin());
    }
}
