//! Site alert model: deadlines and issues attached to a single site.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: i64,
    pub site_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub is_resolved: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlertRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub is_resolved: Option<bool>,
}

impl Alert {
    pub async fn get(db: &SqlitePool, id: i64) -> Result<Option<Alert>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_site(db: &SqlitePool, site_id: i64) -> Result<Vec<Alert>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM alerts WHERE site_id = ? ORDER BY due_date")
            .bind(site_id)
            .fetch_all(db)
            .await
    }

    pub async fn create(
        db: &SqlitePool,
        site_id: i64,
        req: &CreateAlertRequest,
    ) -> Result<Alert, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO alerts (site_id, title, description, due_date, is_resolved)
            VALUES (?, ?, ?, ?, 0)
            RETURNING *
            "#,
        )
        .bind(site_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.due_date)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &SqlitePool, alert: &Alert) -> Result<Alert, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE alerts
            SET title = ?, description = ?, due_date = ?, is_resolved = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&alert.title)
        .bind(&alert.description)
        .bind(&alert.due_date)
        .bind(alert.is_resolved)
        .bind(alert.id)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
