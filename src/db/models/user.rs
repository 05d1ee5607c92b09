//! User, role and session models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Roles a user can hold. Everything that is not an admin is a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Worker => "worker",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "worker" => Some(Role::Worker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub pin: String,
    pub role: String,
    pub vacation_balance: f64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

/// User as returned to callers. The PIN is only included in the admin
/// user-management listing, never in login or profile responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub vacation_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            vacation_balance: user.vacation_balance,
            pin: None,
        }
    }
}

impl UserResponse {
    pub fn with_pin(user: User) -> Self {
        let pin = user.pin.clone();
        Self {
            pin: Some(pin),
            ..UserResponse::from(user)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub pin: String,
    pub role: String,
    #[serde(default)]
    pub vacation_balance: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub pin: Option<String>,
    pub role: Option<String>,
    pub vacation_balance: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

impl User {
    pub async fn get(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users ORDER BY username")
            .fetch_all(db)
            .await
    }

    pub async fn find_by_pin(db: &SqlitePool, pin: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE pin = ?")
            .bind(pin)
            .fetch_optional(db)
            .await
    }

    /// PIN uniqueness is an application-level rule, not a schema
    /// constraint, so it is re-checked on every create and update.
    pub async fn pin_in_use(
        db: &SqlitePool,
        pin: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE pin = ? AND id != ?")
                .bind(pin)
                .bind(exclude_id.unwrap_or(-1))
                .fetch_one(db)
                .await?;
        Ok(count > 0)
    }

    pub async fn username_in_use(
        db: &SqlitePool,
        username: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? AND id != ?")
                .bind(username)
                .bind(exclude_id.unwrap_or(-1))
                .fetch_one(db)
                .await?;
        Ok(count > 0)
    }

    pub async fn create(
        db: &SqlitePool,
        username: &str,
        pin: &str,
        role: Role,
        vacation_balance: f64,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO users (username, pin, role, vacation_balance)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(pin)
        .bind(role.as_str())
        .bind(vacation_balance)
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &SqlitePool,
        id: i64,
        username: &str,
        pin: &str,
        role: &str,
        vacation_balance: f64,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE users
            SET username = ?, pin = ?, role = ?, vacation_balance = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(pin)
        .bind(role)
        .bind(vacation_balance)
        .bind(id)
        .fetch_one(db)
        .await
    }

    /// Deleting a user does not cascade: their entries and leaves keep
    /// the dangling user_id and listings fall back to a sentinel label.
    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn admin_count(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn pin_uniqueness_check_excludes_self() {
        let db = test_pool().await;
        let user = User::create(&db, "anna", "111111", Role::Worker, 0.0)
            .await
            .unwrap();

        assert!(User::pin_in_use(&db, "111111", None).await.unwrap());
        // A user keeping their own PIN on update is not a conflict.
        assert!(!User::pin_in_use(&db, "111111", Some(user.id)).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_by_schema() {
        let db = test_pool().await;
        User::create(&db, "anna", "111111", Role::Worker, 0.0)
            .await
            .unwrap();
        let err = User::create(&db, "anna", "222222", Role::Worker, 0.0)
            .await
            .unwrap_err();
        match err {
            sqlx::Error::Database(e) => assert!(e.message().contains("UNIQUE")),
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_response_never_carries_pin() {
        let response: UserResponse = User {
            id: 1,
            username: "anna".into(),
            pin: "111111".into(),
            role: "worker".into(),
            vacation_balance: 0.0,
        }
        .into();
        assert!(response.pin.is_none());
    }
}
