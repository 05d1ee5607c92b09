//! User management endpoints (admin only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::access::{authorize, Operation};
use crate::api::auth::{is_valid_pin, AuthUser};
use crate::api::error::ApiError;
use crate::db::{CreateUserRequest, Role, UpdateUserRequest, User, UserResponse};
use crate::AppState;

/// List all users, PINs included. This is the admin management view;
/// every other surface strips the PIN.
///
/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    authorize(&caller, Operation::ManageUsers)?;

    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::with_pin).collect()))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    authorize(&caller, Operation::ManageUsers)?;

    if req.username.trim().is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if !is_valid_pin(&req.pin) {
        return Err(ApiError::bad_request("PIN must be exactly 6 digits"));
    }
    let role =
        Role::parse(&req.role).ok_or_else(|| ApiError::bad_request("Invalid role"))?;

    if User::username_in_use(&state.db, &req.username, None).await? {
        return Err(ApiError::conflict("Username already exists"));
    }
    if User::pin_in_use(&state.db, &req.pin, None).await? {
        return Err(ApiError::conflict("PIN already in use"));
    }

    let user = User::create(
        &state.db,
        &req.username,
        &req.pin,
        role,
        req.vacation_balance,
    )
    .await?;

    tracing::info!(username = %user.username, role = %user.role, "User created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(&caller, Operation::ManageUsers)?;

    let mut user = User::get(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(username) = req.username {
        if username.trim().is_empty() {
            return Err(ApiError::bad_request("Username is required"));
        }
        if User::username_in_use(&state.db, &username, Some(user.id)).await? {
            return Err(ApiError::conflict("Username already exists"));
        }
        user.username = username;
    }

    if let Some(pin) = req.pin {
        if !is_valid_pin(&pin) {
            return Err(ApiError::bad_request("PIN must be exactly 6 digits"));
        }
        if User::pin_in_use(&state.db, &pin, Some(user.id)).await? {
            return Err(ApiError::conflict("PIN already in use"));
        }
        user.pin = pin;
    }

    if let Some(role) = req.role {
        let role = Role::parse(&role).ok_or_else(|| ApiError::bad_request("Invalid role"))?;
        user.role = role.as_str().to_string();
    }

    if let Some(balance) = req.vacation_balance {
        // No lower bound: admins may over-allocate, the ledger may have
        // already pushed it negative.
        user.vacation_balance = balance;
    }

    let updated = User::update(
        &state.db,
        user.id,
        &user.username,
        &user.pin,
        &user.role,
        user.vacation_balance,
    )
    .await?;

    Ok(Json(updated.into()))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&caller, Operation::ManageUsers)?;

    if !User::delete(&state.db, user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id, "User deleted");
    Ok(Json(serde_json::json!({ "message": "User deleted" })))
}
